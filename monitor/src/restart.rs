//! Player-aware restart sequence.
//!
//! The timeline is built up front as a flat list of steps (send a command, or
//! wait) and then executed by [`execute_steps`]. Waiting goes through a
//! [`Sleeper`] so tests can run the whole sequence without real time passing.

use crate::config::MonitorConfig;
use log::{debug, info};
use rcon::{CommandSink, RconError};
use std::time::Duration;

/// Warning timings clamped so that `0 <= countdown <= warn_1 <= delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPlan {
    pub delay: u64,
    pub warn_1: u64,
    pub countdown: u64,
}

impl RestartPlan {
    /// Misconfigured values are clamped rather than rejected
    pub fn clamped(delay: i64, warn_1: i64, countdown: i64) -> Self {
        let delay = delay.max(0);
        let warn_1 = warn_1.max(0).min(delay);
        let countdown = countdown.max(0).min(warn_1);

        Self {
            delay: delay as u64,
            warn_1: warn_1 as u64,
            countdown: countdown as u64,
        }
    }

    pub fn from_config(cfg: &MonitorConfig) -> Self {
        Self::clamped(cfg.restart_delay_sec, cfg.warn_1_min_sec, cfg.countdown_sec)
    }

    /// Quiet time between the first warning and the final one
    pub fn wait_before_final_warning(&self) -> Duration {
        Duration::from_secs(self.delay - self.warn_1)
    }

    /// Quiet time between the final warning and the countdown
    pub fn wait_before_countdown(&self) -> Duration {
        Duration::from_secs(self.warn_1 - self.countdown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FirstWarning,
    FinalWarning,
    Countdown(u64),
    Save,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartStep {
    Send { phase: Phase, command: String },
    Wait(Duration),
}

#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&mut self, duration: Duration);
}

/// Real wall-clock waiting
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub fn broadcast_command(text: &str) -> String {
    format!("servermsg \"{}\"", text)
}

/// Renders `seconds` per a `{seconds:SPEC}` field spec: `[[fill]align][0][width][d]`
/// with align one of `<`, `>`, `^`. Numbers right-align by default.
fn format_seconds(spec: &str, seconds: u64) -> Option<String> {
    let value = seconds.to_string();
    let chars: Vec<char> = spec.chars().collect();
    let is_align = |c: char| matches!(c, '<' | '>' | '^');

    let (mut fill, mut align, mut rest) = match chars.as_slice() {
        [f, a, ..] if is_align(*a) => (*f, Some(*a), &chars[2..]),
        [a, ..] if is_align(*a) => (' ', Some(*a), &chars[1..]),
        _ => (' ', None, &chars[..]),
    };

    if align.is_none() && rest.first() == Some(&'0') {
        fill = '0';
        align = Some('>');
        rest = &rest[1..];
    }
    if rest.last() == Some(&'d') {
        rest = &rest[..rest.len() - 1];
    }
    if !rest.iter().all(char::is_ascii_digit) {
        return None;
    }

    let width: usize = if rest.is_empty() {
        0
    } else {
        rest.iter().collect::<String>().parse().ok()?
    };
    let pad = width.saturating_sub(value.len());
    let padding = |n: usize| fill.to_string().repeat(n);

    Some(match align.unwrap_or('>') {
        '<' => format!("{}{}", value, padding(pad)),
        '^' => format!("{}{}{}", padding(pad / 2), value, padding(pad - pad / 2)),
        _ => format!("{}{}", padding(pad), value),
    })
}

/// Substitutes `{seconds}` (optionally `{seconds:SPEC}` with fill, align and
/// width) into the template, honouring `{{` and `}}`.
/// Any other placeholder or a stray brace makes the template unusable.
pub fn format_countdown(template: &str, seconds: u64) -> Option<String> {
    let mut out = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return None,
                    }
                }
                let (name, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                if name != "seconds" {
                    return None;
                }
                out.push_str(&format_seconds(spec, seconds)?);
            }
            '}' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

/// Countdown text, falling back to a generic message on a bad template
pub fn countdown_message(template: &str, seconds: u64) -> String {
    format_countdown(template, seconds).unwrap_or_else(|| {
        debug!("Countdown template unusable, using default text");
        format!("Restart in {} seconds.", seconds)
    })
}

fn save_and_quit(cfg: &MonitorConfig) -> [RestartStep; 2] {
    [
        RestartStep::Send {
            phase: Phase::Save,
            command: cfg.save_command.clone(),
        },
        RestartStep::Send {
            phase: Phase::Quit,
            command: cfg.quit_command.clone(),
        },
    ]
}

/// Nobody online: save and quit straight away
pub fn immediate_steps(cfg: &MonitorConfig) -> Vec<RestartStep> {
    save_and_quit(cfg).to_vec()
}

fn push_wait(steps: &mut Vec<RestartStep>, duration: Duration) {
    if !duration.is_zero() {
        steps.push(RestartStep::Wait(duration));
    }
}

/// Full warning timeline; zero-length waits are left out
pub fn scheduled_steps(cfg: &MonitorConfig, plan: &RestartPlan) -> Vec<RestartStep> {
    let mut steps = vec![RestartStep::Send {
        phase: Phase::FirstWarning,
        command: broadcast_command(&cfg.msg_restart_5min),
    }];

    push_wait(&mut steps, plan.wait_before_final_warning());

    if plan.warn_1 > 0 {
        steps.push(RestartStep::Send {
            phase: Phase::FinalWarning,
            command: broadcast_command(&cfg.msg_restart_1min),
        });
    }

    push_wait(&mut steps, plan.wait_before_countdown());

    for remaining in (1..=plan.countdown).rev() {
        steps.push(RestartStep::Send {
            phase: Phase::Countdown(remaining),
            command: broadcast_command(&countdown_message(&cfg.msg_countdown, remaining)),
        });
        push_wait(&mut steps, Duration::from_secs(1));
    }

    steps.extend(save_and_quit(cfg));
    steps
}

/// Runs steps in order. The first failed command aborts the rest.
pub async fn execute_steps<C, S>(
    rcon: &C,
    sleeper: &mut S,
    steps: &[RestartStep],
) -> Result<(), RconError>
where
    C: CommandSink,
    S: Sleeper,
{
    for step in steps {
        match step {
            RestartStep::Send { phase, command } => {
                match phase {
                    Phase::Countdown(n) => debug!("Countdown {}", n),
                    Phase::Save => info!("Saving world."),
                    Phase::Quit => info!("Sending quit."),
                    _ => debug!("Broadcast: {}", command),
                }
                rcon.send_command(command).await?;
            }
            RestartStep::Wait(duration) => sleeper.sleep(*duration).await,
        }
    }
    Ok(())
}

pub async fn run_restart_sequence<C, S>(
    rcon: &C,
    cfg: &MonitorConfig,
    sleeper: &mut S,
    immediate: bool,
) -> Result<(), RconError>
where
    C: CommandSink,
    S: Sleeper,
{
    let steps = if immediate {
        info!("No players online. Restarting immediately.");
        immediate_steps(cfg)
    } else {
        let plan = RestartPlan::from_config(cfg);
        info!("Restart scheduled in {} seconds.", plan.delay);
        scheduled_steps(cfg, &plan)
    };

    execute_steps(rcon, sleeper, &steps).await
}
