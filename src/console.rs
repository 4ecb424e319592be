//! Terminal operator prompt backed by stdin/stdout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::engine::workflow::OperatorPrompt;

pub struct StdinPrompt {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{question} ");
        std::io::stdout().flush().context("Failed to flush stdout")?;
        self.lines
            .next_line()
            .await
            .context("Failed to read operator input")
    }
}
