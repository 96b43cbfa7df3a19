//! Interactive read-eval-print loop over stdin/stdout.

use crate::client::session::ChatSession;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What to do with one line of user input.
#[derive(Debug, PartialEq, Eq)]
enum LineAction<'a> {
    /// Blank after trimming; re-prompt without calling the model.
    Skip,
    /// Explicit quit/exit.
    Quit,
    /// Forward the trimmed text to the session.
    Send(&'a str),
}

fn classify_line(line: &str) -> LineAction<'_> {
    let input = line.trim();
    if input.is_empty() {
        LineAction::Skip
    } else if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
        LineAction::Quit
    } else {
        LineAction::Send(input)
    }
}

/// Run the interactive chat loop until EOF or an explicit quit.
///
/// Per-turn errors are reported and the loop continues; only fatal errors
/// (none expected past startup) propagate.
pub async fn run_chat(mut session: ChatSession) -> Result<()> {
    println!("--- gemchat ---");
    println!("Type your message, or 'quit' to exit.");
    println!("Example: 'what are the weather alerts for NY?' or 'what time is it?'");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break, // EOF
        };

        match classify_line(&line) {
            LineAction::Skip => continue,
            LineAction::Quit => break,
            LineAction::Send(input) => match session.send(input).await {
                Ok(answer) => println!("\nGemini: {}", answer),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => eprintln!("Error: {}", e),
            },
        }
    }

    Ok(())
}

/// Answer a single prompt and exit (for scripting).
pub async fn run_oneshot(mut session: ChatSession, prompt: &str) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("empty prompt");
    }
    let answer = session.send(prompt).await?;
    println!("{}", answer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::llm::CompletionClient;
    use crate::client::socket::ToolTransport;
    use crate::error::GemchatError;
    use crate::protocol::{ToolInfo, ToolRequest, ToolResponse};
    use crate::transcript::Transcript;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Completion backend that must never be reached.
    struct NoCompletion;

    #[async_trait]
    impl CompletionClient for NoCompletion {
        async fn complete(
            &self,
            _system_instruction: &str,
            _transcript: &Transcript,
        ) -> Result<String, GemchatError> {
            Err(GemchatError::ModelApi("unexpected model call".into()))
        }
    }

    struct NoTransport;

    #[async_trait]
    impl ToolTransport for NoTransport {
        async fn call_tool(&self, _request: ToolRequest) -> Result<ToolResponse, GemchatError> {
            Err(GemchatError::Transport("unexpected tool call".into()))
        }

        async fn list_tools(&self) -> Result<Vec<ToolInfo>, GemchatError> {
            Ok(Vec::new())
        }
    }

    fn dead_session() -> ChatSession {
        let completion: Arc<dyn CompletionClient> = Arc::new(NoCompletion);
        let transport: Arc<dyn ToolTransport> = Arc::new(NoTransport);
        ChatSession::new(completion, transport, &[], 4)
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(classify_line(""), LineAction::Skip);
        assert_eq!(classify_line("   "), LineAction::Skip);
        assert_eq!(classify_line("\t \t"), LineAction::Skip);
    }

    #[test]
    fn test_quit_and_exit_end_the_loop() {
        assert_eq!(classify_line("quit"), LineAction::Quit);
        assert_eq!(classify_line("EXIT"), LineAction::Quit);
        assert_eq!(classify_line("  Quit  "), LineAction::Quit);
    }

    #[test]
    fn test_input_is_trimmed_before_sending() {
        assert_eq!(classify_line("  what time is it?  "), LineAction::Send("what time is it?"));
        // 'quit' embedded in a sentence is a prompt, not a command
        assert_eq!(
            classify_line("how do I quit vim?"),
            LineAction::Send("how do I quit vim?")
        );
    }

    #[tokio::test]
    async fn test_oneshot_empty_prompt_makes_no_model_call() {
        let err = run_oneshot(dead_session(), "   ").await.unwrap_err();
        // The empty-prompt bail fires before the session is touched; a model
        // call would have surfaced NoCompletion's error instead.
        assert_eq!(err.to_string(), "empty prompt");
    }
}
