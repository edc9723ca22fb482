/// An assembled function-execution container.
pub trait Runtime: Send {
    fn id(&self) -> &str;

    /// Whether the container's execution thread is currently running.
    fn is_alive(&self) -> bool;

    /// Signal the container to stop. Does not wait for it.
    fn stop(&mut self);
}
