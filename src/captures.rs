use std::any::TypeId;

use regex::Captures;

/// A type that can be captured from one path segment.
///
/// Each implementation pairs the regex fragment that recognizes the
/// type on the wire with the coercion from the matched text. The
/// fragment must not contain capturing groups; the router wraps it in
/// one.
pub trait PathCapture: Sized + 'static {
    fn fragment() -> &'static str;
    fn from_capture(capture: &str) -> Option<Self>;
}

macro_rules! signed_capture {
    ($($ty:ty)*) => {
        $(
            impl PathCapture for $ty {
                fn fragment() -> &'static str {
                    r"[+-]?\d+"
                }
                fn from_capture(capture: &str) -> Option<$ty> {
                    capture.parse().ok()
                }
            }
        )*
    }
}

macro_rules! unsigned_capture {
    ($($ty:ty)*) => {
        $(
            impl PathCapture for $ty {
                fn fragment() -> &'static str {
                    r"\d+"
                }
                fn from_capture(capture: &str) -> Option<$ty> {
                    capture.parse().ok()
                }
            }
        )*
    }
}

macro_rules! float_capture {
    ($($ty:ty)*) => {
        $(
            impl PathCapture for $ty {
                fn fragment() -> &'static str {
                    // tolerates empty integral or fractional parts:
                    // "5.", ".5" and "5" all match
                    r"[+-]?(?:\d+\.\d*|\d*\.\d+|\d+)"
                }
                fn from_capture(capture: &str) -> Option<$ty> {
                    capture.parse().ok()
                }
            }
        )*
    }
}

signed_capture!(i16 i32 i64);
unsigned_capture!(u16 u32 u64);
float_capture!(f32 f64);

impl PathCapture for String {
    fn fragment() -> &'static str {
        r"[^/]+"
    }
    fn from_capture(capture: &str) -> Option<String> {
        Some(capture.to_string())
    }
}

/// Captures the whole rest of the path, slashes included. Declare it as
/// the last handler parameter to route entire subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rest(pub String);

impl PathCapture for Rest {
    fn fragment() -> &'static str {
        r".*"
    }
    fn from_capture(capture: &str) -> Option<Rest> {
        Some(Rest(capture.to_string()))
    }
}

/// The tuple of captured path parameters of a handler.
///
/// Consumes the regex captures in order, one per declared parameter,
/// exactly like the original's bind-captured step.
pub trait PathArgs: Sized + 'static {
    fn type_ids() -> Vec<TypeId>;
    fn from_captures(caps: &Captures) -> Option<Self>;
}

impl PathArgs for () {
    fn type_ids() -> Vec<TypeId> {
        Vec::new()
    }
    fn from_captures(_caps: &Captures) -> Option<()> {
        Some(())
    }
}

impl<A: PathCapture> PathArgs for (A,) {
    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<A>()]
    }
    fn from_captures(caps: &Captures) -> Option<(A,)> {
        let a = A::from_capture(caps.get(1)?.as_str())?;
        Some((a,))
    }
}

impl<A: PathCapture, B: PathCapture> PathArgs for (A, B) {
    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<A>(), TypeId::of::<B>()]
    }
    fn from_captures(caps: &Captures) -> Option<(A, B)> {
        let a = A::from_capture(caps.get(1)?.as_str())?;
        let b = B::from_capture(caps.get(2)?.as_str())?;
        Some((a, b))
    }
}

impl<A: PathCapture, B: PathCapture, C: PathCapture> PathArgs for (A, B, C) {
    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<A>(), TypeId::of::<B>(), TypeId::of::<C>()]
    }
    fn from_captures(caps: &Captures) -> Option<(A, B, C)> {
        let a = A::from_capture(caps.get(1)?.as_str())?;
        let b = B::from_capture(caps.get(2)?.as_str())?;
        let c = C::from_capture(caps.get(3)?.as_str())?;
        Some((a, b, c))
    }
}

impl<A: PathCapture, B: PathCapture, C: PathCapture, D: PathCapture>
    PathArgs for (A, B, C, D)
{
    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<A>(), TypeId::of::<B>(),
             TypeId::of::<C>(), TypeId::of::<D>()]
    }
    fn from_captures(caps: &Captures) -> Option<(A, B, C, D)> {
        let a = A::from_capture(caps.get(1)?.as_str())?;
        let b = B::from_capture(caps.get(2)?.as_str())?;
        let c = C::from_capture(caps.get(3)?.as_str())?;
        let d = D::from_capture(caps.get(4)?.as_str())?;
        Some((a, b, c, d))
    }
}

impl<A: PathCapture, B: PathCapture, C: PathCapture, D: PathCapture,
     E: PathCapture> PathArgs for (A, B, C, D, E)
{
    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<A>(), TypeId::of::<B>(), TypeId::of::<C>(),
             TypeId::of::<D>(), TypeId::of::<E>()]
    }
    fn from_captures(caps: &Captures) -> Option<(A, B, C, D, E)> {
        let a = A::from_capture(caps.get(1)?.as_str())?;
        let b = B::from_capture(caps.get(2)?.as_str())?;
        let c = C::from_capture(caps.get(3)?.as_str())?;
        let d = D::from_capture(caps.get(4)?.as_str())?;
        let e = E::from_capture(caps.get(5)?.as_str())?;
        Some((a, b, c, d, e))
    }
}

#[cfg(test)]
mod test {
    use super::{PathCapture, Rest};

    #[test]
    fn float_tolerance() {
        assert_eq!(f32::from_capture("5.1"), Some(5.1));
        assert_eq!(f32::from_capture("5."), Some(5.0));
        assert_eq!(f32::from_capture("6.0"), Some(6.0));
        assert_eq!(f64::from_capture(".5"), Some(0.5));
    }

    #[test]
    fn signedness() {
        assert_eq!(i32::from_capture("-10"), Some(-10));
        assert_eq!(i32::from_capture("+7"), Some(7));
        assert_eq!(u32::from_capture("10"), Some(10));
        // the unsigned fragment never matches a sign, but the coercion
        // refuses one too
        assert_eq!(u32::from_capture("-10"), None);
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(u16::from_capture("70000"), None);
        assert_eq!(i16::from_capture("40000"), None);
        assert_eq!(u64::from_capture("18446744073709551615"),
                   Some(u64::max_value()));
    }

    #[test]
    fn strings_and_rest() {
        assert_eq!(String::from_capture("alpha"),
                   Some("alpha".to_string()));
        assert_eq!(Rest::from_capture("a/b/c"),
                   Some(Rest("a/b/c".to_string())));
    }
}
