/// Builds [`Args`](crate::Args) from a list of expressions, each converted with [`Value::from`](crate::Value).
///
/// # Example
///
/// ```ignore
/// let unit = add.call(monocle::args![3, 6]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::default()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::new(vec![$($crate::Value::from($arg)),+])
    };
}
