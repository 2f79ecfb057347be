//! Macros for ergonomic state machine construction.

/// Collect named transitions into a [`MachineBuilder`](crate::builder::MachineBuilder).
///
/// # Example
///
/// ```
/// use turnkeeper::transitions;
/// use turnkeeper::machine::{Context, Flow, MachineError};
/// use serde_json::json;
///
/// fn root(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
///     Ok(ctx.push("END", json!({})))
/// }
///
/// let machine = transitions! {
///     "root" => root,
/// }
/// .build()
/// .unwrap();
///
/// assert!(machine.transitions().contains("root"));
/// ```
#[macro_export]
macro_rules! transitions {
    ($($name:expr => $action:expr),* $(,)?) => {
        $crate::builder::MachineBuilder::new()
            $(.transition($name, $action))*
    };
}
