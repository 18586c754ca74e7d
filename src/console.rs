//! Text-mode adapters
//!
//! Run the interview in a terminal: prompts are printed, answers are typed
//! one line at a time.

use std::io::Write;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::ports::{
    Answer, AnswerSource, CAPTURE_ATTEMPTS, Captured, Expect, Presented, Presenter, REPROMPT,
    is_quit_phrase,
};
use crate::{Error, Result};

/// Reads typed answers, one per line
pub struct ConsoleAnswerSource<R> {
    reader: R,
}

impl ConsoleAnswerSource<BufReader<Stdin>> {
    /// Read from standard input
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> ConsoleAnswerSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[async_trait]
impl<R> AnswerSource for ConsoleAnswerSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn capture(&mut self, question_id: &str, expect: Expect) -> Result<Captured> {
        for attempt in 1..=CAPTURE_ATTEMPTS {
            print!("> ");
            std::io::stdout().flush()?;

            // End of input is the typed equivalent of walking away
            let Some(text) = self.read_line().await? else {
                return Err(Error::Terminated);
            };

            if is_quit_phrase(&text) {
                tracing::info!(question_id, "quit phrase typed");
                return Ok(Captured::Quit);
            }

            if text.split_whitespace().count() >= expect.min_words() {
                return Ok(Captured::Answer(Answer::text_only(text)));
            }

            tracing::debug!(question_id, attempt, "answer too short");
            if attempt < CAPTURE_ATTEMPTS {
                println!("{REPROMPT}");
            }
        }

        Ok(Captured::Answer(Answer::text_only(String::new())))
    }
}

/// Prints prompts to a writer
pub struct ConsolePresenter<W> {
    out: W,
}

impl ConsolePresenter<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsolePresenter<W> {
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    async fn present(&mut self, text: &str, _recording_id: &str) -> Result<Presented> {
        let first_audible_at = Utc::now();
        writeln!(self.out, "\n{text}")?;
        self.out.flush()?;

        Ok(Presented {
            first_audible_at,
            audio_ref: None,
        })
    }
}
