use std::io::{self, Write};

use async_trait::async_trait;

use aisle_core::twofa::ManualCodePrompt;

/// Console fallback for a missing intercepted code. Runs on the blocking
/// pool so the placement worker is not stalled at the runtime level while
/// a human types.
pub struct StdinCodePrompt;

#[async_trait]
impl ManualCodePrompt for StdinCodePrompt {
    async fn prompt_code(&self) -> Option<String> {
        let entered = tokio::task::spawn_blocking(|| {
            let mut stderr = io::stderr();
            let _ = write!(
                stderr,
                "Couldn't find a 2FA code. Please type it manually and press Enter: "
            );
            let _ = stderr.flush();

            let mut line = String::new();
            io::stdin().read_line(&mut line).ok().map(|_| line)
        })
        .await
        .ok()
        .flatten()?;

        let code = entered.trim().to_owned();
        (!code.is_empty()).then_some(code)
    }
}
