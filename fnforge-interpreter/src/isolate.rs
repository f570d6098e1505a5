//! Run evaluations on a dedicated thread with a large stack
//!
//! Candidate programs can nest deeply (recursive functions, nested data);
//! running them on their own thread keeps that away from the caller's stack
//! and turns a panic inside the evaluator into an error.

use std::any::Any;
use std::thread;

use crate::error::{InterpreterError, InterpreterResult};

/// Name given to evaluation threads
pub const THREAD_NAME: &str = "fnforge-interpreter";

/// Run `f` on a scoped thread with `stack_size` bytes of stack
pub fn run_isolated<T, F>(stack_size: usize, f: F) -> InterpreterResult<T>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, f)
            .map_err(|e| {
                InterpreterError::Isolate(format!("failed to spawn evaluation thread: {}", e))
            })?;

        handle
            .join()
            .map_err(|payload| InterpreterError::Isolate(panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("evaluation panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("evaluation panicked: {}", message)
    } else {
        "evaluation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_closure_with_borrowed_data() {
        let numbers = vec![1, 2, 3];
        let sum = run_isolated(1024 * 1024, || numbers.iter().sum::<i32>()).unwrap();
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_panic_becomes_error() {
        let result: InterpreterResult<()> = run_isolated(1024 * 1024, || panic!("boom"));
        match result {
            Err(InterpreterError::Isolate(message)) => assert!(message.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
