//! Prompt text for the two LLM roles: answering the player's prompt and
//! judging the answer.

/// System prompt for answering a player's prompt.
pub const GENERATION_SYSTEM: &str = "You are a helpful assistant. \
    Answer the user's request directly and concisely, in plain prose. \
    Keep the answer under 200 words.";

/// System prompt for the judging call.
pub const JUDGE_SYSTEM: &str = "You are a strict, impartial grader of prompt-engineering \
    attempts. You score how well an AI response addresses the original challenge. \
    Follow the requested output format exactly.";

/// Builds the judge prompt. Each argument is inserted exactly once, so braces
/// in the player's or model's text are never treated as placeholders.
pub fn build_judge_prompt(question: &str, candidate: &str, format: &str) -> String {
    format!(
        "A player was given this challenge:\n\
         {question}\n\
         \n\
         The player's prompt produced this AI response:\n\
         {candidate}\n\
         \n\
         Rate how relevant and accurate the response is to the challenge on a scale of 0 to 10.\n\
         {format}"
    )
}
