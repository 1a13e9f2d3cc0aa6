//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::options::ContainerOptions;
use crate::token::Token;

// Thread-local stack of tokens whose factories are running synchronously
thread_local! {
    static RESOLUTION_TLS: RefCell<Vec<Token>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the thread-local resolution stack.
///
/// Entering fails when the token is already on the stack (a factory asked,
/// directly or through others, for its own token) or when the stack is as
/// deep as the configured limit. The frame is popped on drop, including when
/// the factory panics.
pub(crate) struct StackGuard {
    _private: (),
}

impl StackGuard {
    pub(crate) fn enter(token: &Token, options: &ContainerOptions) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            if options.detect_cycles && stack.iter().any(|t| t == token) {
                let mut path = stack.clone();
                path.push(token.clone());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= options.max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(token.clone());
            Ok(())
        })?;

        Ok(Self { _private: () })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            tls.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_reports_full_path() {
        let options = ContainerOptions::default();
        let _a = StackGuard::enter(&Token::from("a"), &options).unwrap();
        let _b = StackGuard::enter(&Token::from("b"), &options).unwrap();

        match StackGuard::enter(&Token::from("a"), &options) {
            Err(DiError::Circular(path)) => {
                let names: Vec<_> = path.iter().map(ToString::to_string).collect();
                assert_eq!(names, ["a", "b", "a"]);
            }
            _ => panic!("expected circular error"),
        }
    }

    #[test]
    fn frames_pop_on_drop() {
        let options = ContainerOptions::default();
        {
            let _a = StackGuard::enter(&Token::from("a"), &options).unwrap();
        }
        assert!(StackGuard::enter(&Token::from("a"), &options).is_ok());
    }

    #[test]
    fn depth_limit_applies_without_cycle_detection() {
        let options = ContainerOptions::default().max_depth(2).detect_cycles(false);
        let _a = StackGuard::enter(&Token::from("a"), &options).unwrap();
        let _b = StackGuard::enter(&Token::from("a"), &options).unwrap();
        assert!(matches!(
            StackGuard::enter(&Token::from("a"), &options),
            Err(DiError::DepthExceeded(2))
        ));
    }
}
