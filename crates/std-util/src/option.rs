#[macro_export]
macro_rules! assert_none {
    ($e:expr) => {
        match $e {
            None => {}
            Some(actual) => panic!("expected `None`; actual=Some({:?})", actual),
        }
    };
}

#[macro_export]
macro_rules! assert_some {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Some(v) => v,
            None => {
                let mut msg = String::from("expected `Some`; actual=None");
                $( msg.push_str(&format!("; {}", format_args!($($t)*))); )?
                panic!("{}", msg);
            }
        }
    };
}
