/// The closed set of dispatchable operation names, plus the direct
/// tool-execution shortcut (`fabric.tool.<category>.<action>`) which carries
/// its resolved tool id inline rather than matching a fixed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    AgentList,
    AgentDescribe,
    Call,
    RoutePreview,
    Health,
    ToolList,
    ToolDescribe,
    ToolCall,
    ToolShortcut { tool_id: String },
    MessageSend,
    MessageReceive,
    MessageAcknowledge,
    MessagePublish,
    MessageQueueStatus,
}

pub fn parse(name: &str) -> Option<Operation> {
    match name {
        "fabric.agent.list" => Some(Operation::AgentList),
        "fabric.agent.describe" => Some(Operation::AgentDescribe),
        "fabric.call" => Some(Operation::Call),
        "fabric.route.preview" => Some(Operation::RoutePreview),
        "fabric.health" => Some(Operation::Health),
        "fabric.tool.list" => Some(Operation::ToolList),
        "fabric.tool.describe" => Some(Operation::ToolDescribe),
        "fabric.tool.call" => Some(Operation::ToolCall),
        "fabric.message.send" => Some(Operation::MessageSend),
        "fabric.message.receive" => Some(Operation::MessageReceive),
        "fabric.message.acknowledge" => Some(Operation::MessageAcknowledge),
        "fabric.message.publish" => Some(Operation::MessagePublish),
        "fabric.message.queue_status" => Some(Operation::MessageQueueStatus),
        other => other
            .strip_prefix("fabric.tool.")
            .filter(|rest| rest.contains('.'))
            .map(|rest| Operation::ToolShortcut { tool_id: rest.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_fixed_operations() {
        assert_eq!(parse("fabric.call"), Some(Operation::Call));
        assert_eq!(parse("fabric.message.queue_status"), Some(Operation::MessageQueueStatus));
    }

    #[test]
    fn recognizes_tool_shortcut() {
        assert_eq!(
            parse("fabric.tool.io.read_file"),
            Some(Operation::ToolShortcut { tool_id: "io.read_file".to_string() })
        );
    }

    #[test]
    fn rejects_unknown_operation() {
        assert_eq!(parse("fabric.unknown"), None);
        assert_eq!(parse("fabric.tool.bare"), None);
    }
}
