use async_trait::async_trait;
use evalexpr::{ContextWithMutableVariables, HashMapContext, Value as EvalValue, eval_with_context};
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};

/// Whitelist of constants injected into the evaluation context. `evalexpr`
/// only exposes the built-in operators/functions it ships with plus
/// whatever we explicitly bind here — there is no ambient name lookup, so
/// the whitelist is enforced by construction rather than by post-hoc
/// scanning (contrast with the source's `code.co_names` scan).
fn eval_context() -> HashMapContext {
    let mut ctx = HashMapContext::new();
    let _ = ctx.set_value("pi".into(), EvalValue::Float(std::f64::consts::PI));
    let _ = ctx.set_value("e".into(), EvalValue::Float(std::f64::consts::E));
    ctx
}

pub struct EvalTool;

#[async_trait]
impl Tool for EvalTool {
    fn tool_id(&self) -> &str {
        "math.eval"
    }
    fn display_name(&self) -> &str {
        "Evaluate Expression"
    }
    fn category(&self) -> &str {
        "math"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("eval").with_description("Safely evaluate a mathematical expression")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let expression = args["expression"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'expression' argument"))?;

        let ctx = eval_context();
        let result = eval_with_context(expression, &ctx).map_err(|e| {
            FabricError::new(ErrorCode::InvalidExpression, format!("could not evaluate: {e}"))
        })?;

        let (value, kind) = match result {
            EvalValue::Int(i) => (json!(i), "int"),
            EvalValue::Float(f) => (json!(f), "float"),
            EvalValue::Boolean(b) => (json!(b), "bool"),
            other => (json!(other.to_string()), "string"),
        };

        Ok(json!({
            "result": value,
            "expression": expression,
            "type": kind,
        }))
    }
}

pub struct StatisticsTool;

#[async_trait]
impl Tool for StatisticsTool {
    fn tool_id(&self) -> &str {
        "math.statistics"
    }
    fn display_name(&self) -> &str {
        "Statistics"
    }
    fn category(&self) -> &str {
        "math"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("analyze").with_description("Compute statistical measures over a dataset")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let data: Vec<f64> = args["data"]
            .as_array()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'data' array"))?
            .iter()
            .filter_map(Value::as_f64)
            .collect();

        if data.is_empty() {
            return Err(FabricError::new(
                ErrorCode::BadInput,
                "EMPTY_DATA: dataset must contain at least one value",
            ));
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();
        let mut sorted = data.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = if sorted.len() % 2 == 0 {
            (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
        } else {
            sorted[sorted.len() / 2]
        };
        let min = sorted.first().copied().unwrap_or(0.0);
        let max = sorted.last().copied().unwrap_or(0.0);

        Ok(json!({
            "count": data.len(),
            "mean": mean,
            "median": median,
            "stddev": stddev,
            "variance": variance,
            "min": min,
            "max": max,
        }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(EvalTool));
    registry.register(std::sync::Arc::new(StatisticsTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn eval_basic_arithmetic() {
        let tool = EvalTool;
        let result = tool.execute("eval", json!({"expression": "2 + 2"})).await.unwrap();
        assert_eq!(result["result"], json!(4));
    }

    #[tokio::test]
    async fn eval_rejects_garbage() {
        let tool = EvalTool;
        let err = tool
            .execute("eval", json!({"expression": "import os"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidExpression);
    }

    #[tokio::test]
    async fn statistics_on_empty_dataset_is_empty_data() {
        let tool = StatisticsTool;
        let err = tool
            .execute("analyze", json!({"data": []}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadInput);
        assert!(err.to_string().contains("EMPTY_DATA"));
    }

    #[tokio::test]
    async fn statistics_computes_mean_and_median() {
        let tool = StatisticsTool;
        let result = tool
            .execute("analyze", json!({"data": [1.0, 2.0, 3.0, 4.0]}))
            .await
            .unwrap();
        assert_eq!(result["mean"], json!(2.5));
        assert_eq!(result["median"], json!(2.5));
    }
}
