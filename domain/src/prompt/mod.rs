//! Prompt templates for the interview flow

pub mod template;

pub use template::InterviewPromptTemplate;
