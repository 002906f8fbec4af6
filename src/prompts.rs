//! System prompts for the three workflows.

use openrouter_api::ChatMessage;

use crate::buffer::{ActionScope, BufferId, CodeSnapshot};

fn embed_code(snapshot: &CodeSnapshot) -> String {
    let mut sections = String::new();
    for buffer in BufferId::ALL {
        sections.push_str(&format!(
            "{}:\n```{}\n{}\n```\n\n",
            buffer.display_name(),
            buffer.language(),
            snapshot.get(buffer)
        ));
    }
    sections
}

pub fn chat_messages(message: &str, snapshot: &CodeSnapshot) -> Vec<ChatMessage> {
    let system = format!(
        "You are a helpful web development assistant. Answer the user's question about \
         their project, explain concepts, and suggest approaches. Do not return \
         replacement code for the files; the user edits the code themselves.\n\n\
         Current project files:\n\n{}",
        embed_code(snapshot)
    );
    vec![ChatMessage::system(system), ChatMessage::user(message)]
}

pub fn agent_messages(
    instruction: &str,
    scope: ActionScope,
    snapshot: &CodeSnapshot,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are an AI agent that directly modifies code in a web project made of an HTML, \
         a CSS, and a JavaScript file. Apply the user's instruction to {}. For every file \
         you change, return the complete new file content in a single fenced code block \
         tagged html, css, or javascript. Omit files you do not change.\n\n\
         Current project files:\n\n{}",
        scope.describe(),
        embed_code(snapshot)
    );
    vec![ChatMessage::system(system), ChatMessage::user(instruction)]
}

pub fn enhance_messages(buffer: BufferId, code: &str) -> Vec<ChatMessage> {
    let system = format!(
        "You are a helpful web development assistant. Enhance the user's {} code by \
         improving readability, performance, and best practices. Maintain the original \
         functionality and structure. Return only the enhanced code without explanations \
         or additional comments.",
        buffer.display_name()
    );
    vec![ChatMessage::system(system), ChatMessage::user(code)]
}
