//! Terminal front end over `SessionController`.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use services::{
    ContentClient, ControllerState, GenerationRequest, HistoryListItem, SessionController,
    SubmitOutcome,
};
use study_core::model::{OptionKey, Question, SessionId};

/// Generate a session for `request`, then run the quiz.
///
/// # Errors
///
/// Fails when generation fails, input ends early or history cannot be saved.
pub async fn generate_and_take(
    controller: &mut SessionController,
    request: GenerationRequest,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    writeln!(out, "Generating...")?;
    match controller.generate(request).await {
        ControllerState::Ready => take_quiz(controller, input, out).await,
        state => match controller.error() {
            Some(err) => bail!("{err}"),
            None => bail!("generation did not produce a quiz (state: {state:?})"),
        },
    }
}

/// Reopen history entry `id` and run it again.
///
/// # Errors
///
/// Fails when `id` is not in history, input ends early or history cannot be saved.
pub async fn retake(
    controller: &mut SessionController,
    id: SessionId,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !controller.load_from_history(id) {
        bail!("no session with id {id} in history");
    }
    take_quiz(controller, input, out).await
}

/// Ask every question of the current `Ready` session, submit and print the review.
async fn take_quiz(
    controller: &mut SessionController,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(session) = controller.session() else {
        bail!("no session to take");
    };
    let title = session.source().title();
    let level = session.source().level();
    let explanation = session.explanation().map(str::to_owned);
    let questions = session.questions().to_vec();

    match level {
        Some(level) => writeln!(out, "\n== {title} ({}) ==", level.label())?,
        None => writeln!(out, "\n== {title} ==")?,
    }
    if let Some(explanation) = explanation {
        writeln!(out, "\n{explanation}")?;
    }

    let total = questions.len();
    for (index, question) in questions.iter().enumerate() {
        writeln!(out, "\nQuestion {}/{total}: {}", index + 1, question.text())?;
        for option in question.options() {
            writeln!(out, "  {}) {}", option.key, option.label)?;
        }
        loop {
            write!(out, "Your answer: ")?;
            out.flush()?;
            let line = read_line(input)?;
            if let Some(key) = match_key(question, &line) {
                if controller.record_answer(index, key) {
                    break;
                }
            }
            let keys: Vec<&str> = question.options().iter().map(|o| o.key.as_str()).collect();
            writeln!(out, "Please choose one of: {}", keys.join(", "))?;
        }
    }

    let saved = controller.submit().await;
    if let Ok(SubmitOutcome::Rejected) = saved {
        bail!("quiz could not be submitted");
    }
    print_review(controller, &questions, out)?;
    saved.context("result could not be saved to history")?;
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read answer")?;
    if read == 0 {
        bail!("input closed before the quiz was finished");
    }
    Ok(line.trim().to_owned())
}

/// Option key typed by the user: the key itself (any case) or its 1-based position.
fn match_key(question: &Question, raw: &str) -> Option<OptionKey> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let options = question.options();
    if let Some(option) = options
        .iter()
        .find(|option| option.key.as_str().eq_ignore_ascii_case(raw))
    {
        return Some(option.key.clone());
    }
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| options.get(index))
        .map(|option| option.key.clone())
}

fn print_review(
    controller: &SessionController,
    questions: &[Question],
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(score) = controller.score() else {
        return Ok(());
    };
    writeln!(
        out,
        "\nScore: {}/{} ({}%)",
        score.correct,
        score.total,
        score.percentage()
    )?;
    writeln!(out, "{}", score.feedback().message())?;

    for result in controller.results() {
        let text = questions
            .get(result.index)
            .map_or("", |question| question.text());
        writeln!(out, "\n{}. {text}", result.index + 1)?;
        writeln!(out, "   {}", result.message())?;
    }
    Ok(())
}

/// Print history newest first.
///
/// # Errors
///
/// Fails only if `out` cannot be written.
pub fn print_history(items: &[HistoryListItem], out: &mut impl Write) -> anyhow::Result<()> {
    if items.is_empty() {
        writeln!(out, "No sessions yet.")?;
        return Ok(());
    }
    for item in items {
        let score = item
            .score
            .map_or_else(|| "-".to_owned(), |s| format!("{}/{}", s.correct, s.total));
        let level = item.level.map(|level| format!(" [{level}]")).unwrap_or_default();
        writeln!(
            out,
            "{:<14} {}  {:>5}  {}{level}",
            item.id.to_string(),
            item.created_at.format("%Y-%m-%d %H:%M"),
            score,
            item.title
        )?;
    }
    Ok(())
}

/// # Errors
///
/// Fails when the service cannot be reached or reports a failure.
pub async fn health(client: &dyn ContentClient, out: &mut impl Write) -> anyhow::Result<()> {
    client
        .health_check()
        .await
        .context("generation service is not reachable")?;
    writeln!(out, "Generation service is reachable.")?;
    Ok(())
}
