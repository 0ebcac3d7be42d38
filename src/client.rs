use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use time::{OffsetDateTime, format_description};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::config::PlannerConfig;
use crate::infra::{Action, ClientError, PlanObserver};
use crate::planners::sequential::SequentialPlanner;
use crate::state::parse_level;

/// Name announced to the server before the level is sent.
pub const CLIENT_NAME: &str = "boxbot";

/// One protocol line per joint action: `a0@a0|a1@a1|...`.
pub fn joint_action_line(joint: &[Action]) -> String {
    joint
        .iter()
        .map(|action| format!("{0}@{0}", action.name()))
        .collect::<Vec<_>>()
        .join("|")
}

pub struct Client<O: PlanObserver> {
    config: PlannerConfig,
    replays_folder: Option<String>,
    observer: O,
}

impl<O: PlanObserver> Client<O> {
    pub fn new(config: PlannerConfig, replays_folder: Option<String>, observer: O) -> Self {
        Self {
            config,
            replays_folder,
            observer,
        }
    }

    /// Talks to the server over stdin/stdout.
    pub async fn run(&mut self) -> Result<bool, ClientError> {
        self.run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Announces the client, reads and solves the level, then sends the plan
    /// one joint action at a time, waiting for the server's answer to each.
    /// Returns whether a plan was found.
    pub async fn run_with<R, W>(&mut self, reader: R, mut writer: W) -> Result<bool, ClientError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        send_line(&mut writer, CLIENT_NAME).await?;

        let text = read_level(&mut lines).await?;
        let initial = parse_level(&text)?;
        let name = initial.level().name.clone();
        self.observer.on_level_loaded(&name, &initial);

        let result = SequentialPlanner::new(self.config, &mut self.observer).plan(&initial);
        let plan = match result {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!("Planning failed: {}", err);
                self.observer.on_finished(false, 0);
                return Ok(false);
            }
        };

        let mut replay_file = self.replays_folder.as_deref().and_then(|folder| {
            ReplayFile::new(folder, &name)
                .map_err(|err| tracing::warn!("Unable to create replay file: {}", err))
                .ok()
        });

        for (step, joint) in plan.iter().enumerate() {
            let line = joint_action_line(joint);
            send_line(&mut writer, &line).await?;
            let response = lines.next_line().await?.ok_or(ClientError::ServerClosed)?;
            if response.contains("false") {
                tracing::warn!("Server rejected step {}: {} -> {}", step, line, response);
            }
            if let Some(ref mut replay_file) = replay_file {
                replay_file.append(&line, &response)?;
            }
            self.observer.on_action_sent(step, &line, &response);
        }
        if let Some(replay_file) = replay_file {
            replay_file.finish()?;
        }

        self.observer.on_finished(true, plan.len());
        Ok(true)
    }
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Collects the level text up to and including `#end`.
async fn read_level<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<String, ClientError> {
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        text.push_str(&line);
        text.push('\n');
        if line.trim() == "#end" {
            return Ok(text);
        }
    }
    Err(ClientError::ServerClosed)
}

/// Plain-text log of a run: the level name followed by every sent line and
/// the server's answer.
struct ReplayFile {
    file: BufWriter<File>,
}

impl ReplayFile {
    fn new(replays_folder: &str, level_name: &str) -> io::Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format = format_description::parse("[year][month][day]-[hour][minute][second]")
            .map_err(io::Error::other)?;
        let date_time_str = now.format(&format).map_err(io::Error::other)?;

        let filename = Path::new(replays_folder)
            .join(format!("{} - {} - {}.log", CLIENT_NAME, date_time_str, level_name));

        if let Some(parent) = filename.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = BufWriter::new(File::create(filename)?);
        writeln!(file, "#levelname {}", level_name)?;
        Ok(ReplayFile { file })
    }

    fn append(&mut self, line: &str, response: &str) -> io::Result<()> {
        writeln!(self.file, "{} -> {}", line, response)
    }

    fn finish(mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Direction::{E, N};
    use crate::infra::DefaultObserver;
    use pretty_assertions::assert_eq;

    const LEVEL: &str = "\
#domain
hospital
#levelname
push
#colors
blue: 0, A
#initial
+++++++
+0A   +
+++++++
#goal
+++++++
+   A +
+++++++
#end
";

    #[test]
    fn test_joint_action_line() {
        assert_eq!(
            joint_action_line(&[Action::Move(N), Action::NoOp, Action::Pull(E, N)]),
            "Move(N)@Move(N)|NoOp@NoOp|Pull(E,N)@Pull(E,N)"
        );
    }

    #[tokio::test]
    async fn test_client_sends_plan_line_by_line() {
        let input = format!("{LEVEL}true\ntrue\n");
        let mut output = Vec::new();
        let mut client = Client::new(PlannerConfig::default(), None, DefaultObserver);

        let solved = client.run_with(input.as_bytes(), &mut output).await.unwrap();
        assert!(solved);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "boxbot\nPush(E,E)@Push(E,E)\nPush(E,E)@Push(E,E)\n"
        );
    }

    #[tokio::test]
    async fn test_replay_file_records_every_line() {
        let folder = std::env::temp_dir().join(format!("boxbot-replays-{}", std::process::id()));
        let input = format!("{LEVEL}true\ntrue\n");
        let mut output = Vec::new();
        let mut client = Client::new(
            PlannerConfig::default(),
            Some(folder.to_string_lossy().into_owned()),
            DefaultObserver,
        );
        assert!(client.run_with(input.as_bytes(), &mut output).await.unwrap());

        let entry = std::fs::read_dir(&folder).unwrap().next().unwrap().unwrap();
        let text = std::fs::read_to_string(entry.path()).unwrap();
        std::fs::remove_dir_all(&folder).unwrap();
        assert_eq!(
            text,
            "#levelname push\nPush(E,E)@Push(E,E) -> true\nPush(E,E)@Push(E,E) -> true\n"
        );
    }

    #[tokio::test]
    async fn test_server_hangs_up() {
        let input = format!("{LEVEL}true\n");
        let mut output = Vec::new();
        let mut client = Client::new(PlannerConfig::default(), None, DefaultObserver);
        let result = client.run_with(input.as_bytes(), &mut output).await;
        assert!(matches!(result, Err(ClientError::ServerClosed)));
    }

    #[tokio::test]
    async fn test_truncated_level() {
        let mut output = Vec::new();
        let mut client = Client::new(PlannerConfig::default(), None, DefaultObserver);
        let result = client.run_with("#domain\nhospital\n".as_bytes(), &mut output).await;
        assert!(matches!(result, Err(ClientError::ServerClosed)));
    }
}
