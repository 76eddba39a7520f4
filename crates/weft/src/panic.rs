//! Panic payload formatting.

use std::any::Any;

/// Render a panic payload as text.
///
/// String payloads are returned as is; common scalar payloads use their
/// `Display` form and anything else falls back to `Debug`.
///
/// ```
/// use weft::panic_message;
///
/// let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .or_else(|| payload.downcast_ref::<i32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<i64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<usize>().map(ToString::to_string))
        .unwrap_or_else(|| format!("{payload:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Box::new("static str"), "static str")]
    #[case(Box::new(String::from("owned")), "owned")]
    #[case(Box::new(7_i32), "7")]
    #[case(Box::new(9_usize), "9")]
    fn formats_common_payloads(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }

    #[test]
    fn falls_back_to_debug() {
        struct Opaque;
        let payload: Box<dyn Any + Send> = Box::new(Opaque);
        assert_eq!(panic_message(payload.as_ref()), "Any { .. }");
    }

    #[test]
    fn formats_caught_panics() {
        let payload = std::panic::catch_unwind(|| panic!("value was {}", 3))
            .err()
            .unwrap_or_else(|| panic!("closure should panic"));
        assert_eq!(panic_message(payload.as_ref()), "value was 3");
    }
}
