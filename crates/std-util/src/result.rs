/// Unwraps the `Err` of a result, panicking with the `Ok` value otherwise.
/// Extra arguments are formatted into the panic message.
#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            actual => {
                let mut msg = format!("expected `Err`; actual={:?}", actual);
                $( msg.push_str(&format!("; {}", format_args!($($t)*))); )?
                panic!("{}", msg);
            }
        }
    };
}

/// Unwraps the `Ok` of a result, panicking with the error otherwise.
#[macro_export]
macro_rules! assert_ok {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Ok(v) => v,
            Err(err) => {
                let mut msg = format!("expected `Ok`; error={}", err);
                $( msg.push_str(&format!("; {}", format_args!($($t)*))); )?
                panic!("{}", msg);
            }
        }
    };
}
