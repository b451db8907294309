/// Modal text prompts and notifications for the operator.
pub trait OperatorInput: Send {
    /// Asks a question and blocks for the answer. `None` means the operator
    /// cancelled.
    fn prompt(&mut self, question: &str) -> Option<String>;

    fn notify(&mut self, message: &str);
}
