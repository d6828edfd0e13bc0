//! Prompt text shared by every provider.

use crate::safety::{CLARIFICATION_SENTINEL, DATAFRAME_IDENT, NOT_POSSIBLE_SENTINEL};
use once_cell::sync::Lazy;

/// System prompt sent with every generation request.
///
/// Rules: a single reassignment statement on `df`, no imports, no file I/O,
/// no eval/exec, no explicit loops, no semicolons, and the two exact
/// sentinel replies for ambiguous and impossible requests.
pub static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    format!(
        "You are a pandas code generator. Follow these rules strictly:\n\
        \n\
        1. Generate ONLY one executable pandas Python statement\n\
        2. The dataframe is named '{df}' - ALWAYS use reassignment pattern: {df} = {df}.operation()\n\
        3. Use only pandas operations and basic Python (no imports, no file operations)\n\
        4. If instruction is vague, respond EXACTLY: \"{clarify}\"\n\
        5. If operation is impossible/dangerous, respond EXACTLY: \"{impossible}\"\n\
        6. Code must be safe (no file operations, eval, exec, loops, semicolons, or complex logic)\n\
        7. Return only the code, no explanations or markdown formatting\n\
        \n\
        CRITICAL PATTERN - Always reassign to {df}:\n\
        CORRECT: {df} = {df}.drop(columns=['A'])\n\
        WRONG: {df}.drop(columns=['A'])\n\
        CORRECT: {df} = {df}.fillna(0)\n\
        WRONG: {df}.fillna(0, inplace=True)\n\
        \n\
        Examples:\n\
        - \"remove null values\" -> {df} = {df}.dropna()\n\
        - \"fill missing values with 0\" -> {df} = {df}.fillna(0)\n\
        - \"rename column A to B\" -> {df} = {df}.rename(columns={{'A': 'B'}})\n\
        - \"delete column Age\" -> {df} = {df}.drop(columns=['Age'])\n\
        - \"remove first 3 rows\" -> {df} = {df}.drop(index=[0, 1, 2])\n\
        - \"keep only rows where Age > 30\" -> {df} = {df}[{df}['Age'] > 30]\n\
        - \"reorder columns: B, A, C\" -> {df} = {df}[['B', 'A', 'C']]\n\
        - \"sort by Name\" -> {df} = {df}.sort_values('Name')\n",
        df = DATAFRAME_IDENT,
        clarify = CLARIFICATION_SENTINEL,
        impossible = NOT_POSSIBLE_SENTINEL,
    )
});

/// The user turn: table context followed by the instruction.
pub fn user_message(context: &str, instruction: &str) -> String {
    format!("Context:\n{}\n\nInstruction: {}", context, instruction)
}

/// System prompt and user turn in a single block, for providers without a
/// separate system role.
pub fn combined_prompt(context: &str, instruction: &str) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT.as_str(), user_message(context, instruction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_contains_sentinels() {
        assert!(SYSTEM_PROMPT.contains("\"Can you elaborate?\""));
        assert!(SYSTEM_PROMPT.contains("\"This operation is not possible\""));
    }

    #[test]
    fn test_system_prompt_requires_reassignment() {
        assert!(SYSTEM_PROMPT.contains("df = df.operation()"));
        assert!(SYSTEM_PROMPT.contains("no imports"));
        assert!(SYSTEM_PROMPT.contains("rename(columns={'A': 'B'})"));
    }

    #[test]
    fn test_user_message_layout() {
        assert_eq!(
            user_message("Name | Age\nBob | 30", "sort by Age"),
            "Context:\nName | Age\nBob | 30\n\nInstruction: sort by Age"
        );
    }

    #[test]
    fn test_combined_prompt_starts_with_system_prompt() {
        let prompt = combined_prompt("ctx", "do it");
        assert!(prompt.starts_with("You are a pandas code generator."));
        assert!(prompt.ends_with("Context:\nctx\n\nInstruction: do it"));
    }
}
