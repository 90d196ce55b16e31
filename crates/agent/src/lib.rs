//! The ReAct agent loop for reactor.
//!
//! The agent follows a **Reason → Act → Observe** cycle over tagged text:
//!
//! 1. **Seed** the transcript with the system prompt and the user query
//! 2. **Stream** the model's reply, stopping as soon as a call is complete
//! 3. **Parse** `<tool>NAME</tool><args>{...}</args>` into a decision
//! 4. **If a tool call**: run the tool, append `<observation>...</observation>`,
//!    loop back to step 2
//! 5. **If a finish call**: return the final answer
//!
//! Malformed output and unknown tools never abort the loop; the model sees
//! its own output on the next turn and gets another chance.

pub mod events;
pub mod literal;
pub mod parser;
pub mod prompt;
pub mod react;
pub mod sink;

#[cfg(test)]
mod test_helpers;

pub use events::ReactEvent;
pub use literal::{LiteralError, parse_literal, parse_mapping};
pub use parser::{ParseOutcome, ParsedDecision, StreamBuffer, StreamParser};
pub use prompt::PromptTemplate;
pub use react::{ReactAgent, ReactOutcome};
pub use sink::{JsonlTranscriptSink, TranscriptEntry};
