/// Asserts that a collection with an `is_empty` method holds nothing.
#[macro_export]
macro_rules! assert_empty {
    ($e:expr) => {{
        let v = &$e;
        if !v.is_empty() {
            panic!("expected empty; actual={:?}", v);
        }
    }};
}
