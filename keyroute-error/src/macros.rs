/// Немедленно возвращает `Err(StackError)` из текущей функции.
///
/// Формы:
/// - `bail!(err)`: готовая типизированная ошибка;
/// - `bail!(code, "msg")`: `GenericError` с кодом и сообщением;
/// - `bail!(code, "fmt {}", arg)`: то же с форматированием.
///
/// ```ignore
/// use keyroute_error::{bail, StatusCode};
///
/// fn check_capacity(capacity: usize) -> keyroute_error::RouteResult<()> {
///     if capacity == 0 {
///         bail!(StatusCode::InvalidArgs, "capacity must be positive");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, $msg)
        ))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($fmt, $($arg)*))
        ))
    };
}

/// Вызывает `bail!`, если условие ложно. Формы те же, что у `bail!`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
    ($cond:expr, $code:expr, $msg:expr) => {
        if !($cond) {
            $crate::bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($code, $fmt, $($arg)*);
        }
    };
}

/// Расширение `Result`: превращает ошибку в [`StackError`](crate::StackError)
/// и приклеивает контекст.
pub trait ResultExt<T> {
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>;

    /// Ленивый вариант: строка контекста строится только при ошибке.
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(ctx)),
        }
    }

    #[track_caller]
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(f())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, RouteResult, StatusCode};

    #[test]
    fn test_bail_with_format() {
        fn example(value: usize) -> RouteResult<()> {
            bail!(StatusCode::InvalidArgs, "bad capacity: {}", value);
        }

        let err = example(0).unwrap_err();
        assert!(err.is(StatusCode::InvalidArgs));
        assert!(err.to_string().contains("bad capacity: 0"));
    }

    #[test]
    fn test_ensure() {
        fn validate(workers: usize) -> RouteResult<()> {
            ensure!(
                workers > 0,
                ConfigError::Invalid {
                    field: "work_thread_num".into(),
                    reason: "must be positive".into(),
                }
            );
            ensure!(workers < 64, StatusCode::InvalidArgs, "too many workers");
            Ok(())
        }

        assert!(validate(2).is_ok());
        assert!(validate(0).unwrap_err().is(StatusCode::InvalidConfig));
        assert!(validate(100).unwrap_err().is(StatusCode::InvalidArgs));
    }

    /// Тест проверяет, что `with_context` не строит строку при успехе.
    #[test]
    fn test_result_ext_lazy() {
        let mut called = false;
        let ok: Result<u8, ConfigError> = Ok(1);
        let v = ok
            .with_context(|| {
                called = true;
                "never"
            })
            .unwrap();
        assert_eq!(v, 1);
        assert!(!called);

        let err: Result<u8, ConfigError> = Err(ConfigError::Load {
            reason: "missing".into(),
        });
        let err = err.context("loading settings").unwrap_err();
        assert_eq!(err.contexts()[0].message, "loading settings");
    }
}
