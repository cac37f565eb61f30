#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex);
///  data.some_field = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let rules = read_lock!(manager.user_rules);
///  println!("{}", rules.len());
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut rules = write_lock!(manager.user_rules);
///  rules.push_front(rule);
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.write().expect("Failed to acquire write lock")
    };
}

/// Helper macro for reading locked items through a closure
///
/// ```rust, ignore
///  let count = with_read!(manager.user_rules, |rules| rules.len());
/// ```
macro_rules! with_read {
    ($arc_rwlock:expr, $closure:expr) => {{
        let guard = $arc_rwlock.read().expect("Failed to acquire read lock");
        $closure(&*guard)
    }};
}

/// Helper macro for writing to locked items through a closure
///
/// ```rust, ignore
///  with_write!(manager.user_rules, |rules| rules.clear());
/// ```
macro_rules! with_write {
    ($arc_rwlock:expr, $closure:expr) => {{
        let mut guard = $arc_rwlock.write().expect("Failed to acquire write lock");
        $closure(&mut *guard)
    }};
}

/// Builds a `Vec<Value>` from a list of expressions convertible into [`crate::Value`]
///
/// ```rust
/// use dotfake::{args, Value};
///
/// let arguments = args![1, "two", true];
/// assert_eq!(arguments[0], Value::I4(1));
/// assert_eq!(arguments.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}
