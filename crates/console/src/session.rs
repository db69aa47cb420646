//! Question/answer loop, generic over its input and output

use chatbridge_common::errors::Result;
use chatbridge_common::ChatPipeline;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const GREETING: &[&str] = &[
    "Halo! Saya adalah chatbot yang bisa membantu Anda mengecek harga produk atau status perangkat.",
    "Silakan ketik pertanyaan Anda (ketik 'exit' untuk keluar).",
];
pub const PROMPT: &str = "Anda: ";
pub const FAREWELL: &str = "Chatbot: Sampai jumpa!";
pub const EXIT_COMMAND: &str = "exit";

pub struct ConsoleSession<R, W> {
    pipeline: Arc<ChatPipeline>,
    input: R,
    output: W,
}

impl<R, W> ConsoleSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(pipeline: Arc<ChatPipeline>, input: R, output: W) -> Self {
        Self {
            pipeline,
            input,
            output,
        }
    }

    /// Greet, answer until `exit` or end of input, then say goodbye.
    ///
    /// Returns the number of questions answered.
    pub async fn run(mut self) -> Result<usize> {
        for line in GREETING {
            self.write_line(line).await?;
        }

        let mut answered = 0;
        let mut line = String::new();
        loop {
            self.output.write_all(format!("\n{}", PROMPT).as_bytes()).await?;
            self.output.flush().await?;

            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                // End of input leaves the cursor after the prompt
                self.output.write_all(b"\n").await?;
                break;
            }

            let query = line.trim();
            if query.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }
            if query.is_empty() {
                continue;
            }

            let answer = self.pipeline.answer(query).await;
            self.write_line(&format!("Chatbot: {}", answer)).await?;
            answered += 1;
        }

        self.write_line(FAREWELL).await?;
        Ok(answered)
    }

    async fn write_line(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_common::db::models::DeviceStatus;
    use chatbridge_common::db::MemoryCatalog;
    use chatbridge_common::llm::ScriptedGenerator;

    fn pipeline(generator: Arc<ScriptedGenerator>) -> Arc<ChatPipeline> {
        let catalog = MemoryCatalog::new().with_device(
            "OLT-JKT-002",
            DeviceStatus::Offline,
            "Jakarta",
            "2025-05-24 18:30:00",
        );
        Arc::new(ChatPipeline::new(Arc::new(catalog), generator))
    }

    async fn converse(generator: Arc<ScriptedGenerator>, input: &str) -> (usize, String) {
        let mut output = Vec::new();
        let answered = ConsoleSession::new(pipeline(generator), input.as_bytes(), &mut output)
            .run()
            .await
            .unwrap();
        (answered, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_greets_answers_and_exits() {
        let generator = Arc::new(ScriptedGenerator::new(["OLT-JKT-002 sedang Offline."]));

        let (answered, output) = converse(generator.clone(), "cek status olt-jkt-002\nexit\n").await;

        assert_eq!(answered, 1);
        assert!(output.starts_with(GREETING[0]));
        assert!(output.contains("\nAnda: Chatbot: OLT-JKT-002 sedang Offline.\n"));
        assert!(output.ends_with("\nAnda: Chatbot: Sampai jumpa!\n"));
        assert!(generator
            .last_prompt()
            .unwrap()
            .contains("Saat ini Offline di Jakarta"));
    }

    #[tokio::test]
    async fn test_exit_is_case_insensitive() {
        let generator = Arc::new(ScriptedGenerator::new(["never"]));

        let (answered, output) = converse(generator.clone(), "  EXIT \nHalo\n").await;

        assert_eq!(answered, 0);
        assert_eq!(generator.calls(), 0);
        assert!(output.ends_with(&format!("{}\n", FAREWELL)));
        assert_eq!(output.matches(PROMPT).count(), 1);
    }

    #[tokio::test]
    async fn test_blank_lines_reprompt_and_eof_ends() {
        let generator = Arc::new(ScriptedGenerator::new(["Halo juga!"]));

        let (answered, output) = converse(generator.clone(), "\n   \nHalo").await;

        assert_eq!(answered, 1);
        assert_eq!(generator.calls(), 1);
        assert_eq!(output.matches(PROMPT).count(), 4);
        assert!(output.ends_with("Anda: \nChatbot: Sampai jumpa!\n"));
    }

    #[tokio::test]
    async fn test_generation_failure_apologizes() {
        let generator = Arc::new(ScriptedGenerator::unavailable("quota exceeded"));

        let (answered, output) = converse(generator, "Halo\n").await;

        assert_eq!(answered, 1);
        assert!(output.contains("Chatbot: Maaf, ada masalah teknis. Silakan coba lagi nanti.\n"));
    }
}
