use std::fmt::Write as _;

use agentflow_core::AgentRecord;
use agentflow_core::ChatMessage;
use agentflow_core::Conversation;
use agentflow_core::ExecutionGraphState;
use agentflow_core::MessageRole;
use agentflow_core::Preferences;
use agentflow_core::TaskPlan;

pub fn message(message: &ChatMessage) -> String {
    let role = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "agentflow",
        MessageRole::Agent => message.agent_id.as_deref().unwrap_or("agent"),
    };
    let mut out = format!("{role}> {}", message.content);
    if let Some(url) = &message.image_url {
        let _ = write!(out, " [image {} bytes]", url.len());
    }
    if let Some(plan) = &message.task_plan {
        out.push('\n');
        out.push_str(&self::plan(plan));
    }
    if let Some(graph) = &message.execution_graph {
        out.push('\n');
        out.push_str(&self::graph(graph));
    }
    out
}

pub fn plan(plan: &TaskPlan) -> String {
    let mut out = format!("plan {} [{}]: {}", plan.id, plan.status.label(), plan.summary);
    for (index, step) in plan.steps.iter().enumerate() {
        let _ = write!(
            out,
            "\n  {}. [{}] {} ({}) {}",
            index + 1,
            step.status.label(),
            step.id,
            step.agent_id,
            step.description
        );
        if step.requires_approval {
            out.push_str(" *approval*");
        }
        if let Some(result) = &step.result {
            let _ = write!(out, "\n       -> {result}");
        }
    }
    out
}

pub fn graph(graph: &ExecutionGraphState) -> String {
    let mut out = format!("graph {} [{}]", graph.task_id, graph.status.label());
    for node in &graph.nodes {
        let marker = if graph.current_node_id.as_deref() == Some(node.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = write!(
            out,
            "\n {marker} {:<12} {:<13} {:<17} @({:.0},{:.0})",
            node.kind.label(),
            node.id,
            node.status.label(),
            node.position.x,
            node.position.y
        );
        if let Some(ms) = node.duration_ms {
            let _ = write!(out, " {ms}ms");
        }
    }
    for edge in &graph.edges {
        let _ = write!(
            out,
            "\n   {} -> {} [{}]",
            edge.source,
            edge.target,
            edge.status.label()
        );
    }
    if let Some(checkpoint) = &graph.pending_checkpoint {
        let _ = write!(out, "\n   waiting for approval of {}", checkpoint.step_id);
    }
    out
}

pub fn history(entries: &[Conversation]) -> String {
    if entries.is_empty() {
        return "no archived conversations".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}  {}  {:>3} msgs  {}",
                entry.id,
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.messages.len(),
                entry.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn settings(preferences: &Preferences) -> String {
    let direction = if preferences.language.is_rtl() {
        "rtl"
    } else {
        "ltr"
    };
    format!(
        "transparency: {}\nmodality:     {}\ntheme:        {}\nlanguage:     {} ({direction})",
        preferences.transparency.label(),
        preferences.modality.label(),
        preferences.theme.label(),
        preferences.language.label(),
    )
}

pub fn agents(agents: &[AgentRecord]) -> String {
    if agents.is_empty() {
        return "no agents registered".to_string();
    }
    agents
        .iter()
        .map(|agent| {
            let state = if agent.enabled { "on " } else { "off" };
            let mut line = format!("[{state}] {:<12} {}", agent.id, agent.name);
            if agent.requires_approval {
                line.push_str(" (approval)");
            }
            if let Some(guidance) = agent.constitution.as_deref().filter(|g| !g.is_empty()) {
                let _ = write!(line, "\n      guidance: {guidance}");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use agentflow_core::InputModality;
    use agentflow_core::Language;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn arabic_renders_right_to_left() {
        let preferences = Preferences {
            language: Language::Ar,
            ..Preferences::default()
        };
        assert_eq!(
            settings(&preferences),
            "transparency: full_transparency\nmodality:     multimodal\ntheme:        dark\nlanguage:     ar (rtl)"
        );
    }

    #[test]
    fn user_message_is_prefixed() {
        let msg = ChatMessage::new(MessageRole::User, "find papers", InputModality::Text);
        assert_eq!(message(&msg), "you> find papers");
    }

    #[test]
    fn disabled_agent_shows_guidance() {
        let agent = AgentRecord {
            id: "arxiv".to_string(),
            name: "arXiv".to_string(),
            enabled: false,
            constitution: Some("cite sources".to_string()),
            ..AgentRecord::default()
        };
        assert_eq!(
            agents(&[agent]),
            "[off] arxiv        arXiv\n      guidance: cite sources"
        );
    }
}
