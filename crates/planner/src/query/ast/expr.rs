use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bound as a query parameter.
    Value(Value),
}
