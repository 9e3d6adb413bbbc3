pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_boost(boost: f32) -> super::Result<f32> {
        verify_arg!(boost, boost > 0.0);
        Ok(boost)
    }

    #[test]
    fn test_verify_arg_macro() {
        assert_eq!(check_boost(2.0).unwrap(), 2.0);
        let err = check_boost(0.0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "boost");
                assert_eq!(message, "boost > 0.0");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
