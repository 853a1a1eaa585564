use crate::models::{HabitView, TodayResponse};

pub fn render_index(today: &TodayResponse, dark_mode: bool) -> String {
    let rows = if today.habits.is_empty() {
        EMPTY_ROW.to_string()
    } else {
        today.habits.iter().map(render_habit).collect::<String>()
    };

    INDEX_HTML
        .replace("{{THEME}}", if dark_mode { "dark" } else { "light" })
        .replace("{{DATE}}", &today.date.to_string())
        .replace("{{DONE}}", &today.completed.to_string())
        .replace("{{TOTAL}}", &today.total.to_string())
        .replace("{{HABITS}}", &rows)
}

fn render_habit(view: &HabitView) -> String {
    let (state, label) = if view.completed_today {
        ("done", "Undo")
    } else {
        ("open", "Check in")
    };
    format!(
        r#"<li class="habit {state}" style="--habit-color: {color}">
        <div class="habit-main">
          <span class="habit-name">{name}</span>
          <span class="habit-meta">
            {streak} day streak &middot; next milestone {next} ({progress:.0}%)
          </span>
        </div>
        <form method="post" action="/habits/{id}/toggle">
          <button type="submit">{label}</button>
        </form>
      </li>
"#,
        color = escape_html(&view.habit.color),
        name = escape_html(&view.habit.name),
        streak = view.streak.current_streak,
        next = view.next_milestone,
        progress = view.milestone_progress,
        id = escape_html(&view.habit.id),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const EMPTY_ROW: &str =
    r#"<li class="empty">Nothing due today. Add a habit through the API to get started.</li>"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="{{THEME}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>
    :root {
      --bg: #f6f4ef;
      --ink: #23221f;
      --muted: #7a746d;
      --card: #ffffff;
      --border: rgba(35, 34, 31, 0.08);
      --shadow: 0 24px 60px rgba(35, 34, 31, 0.12);
    }

    [data-theme="dark"] {
      --bg: #17181b;
      --ink: #ecebe8;
      --muted: #9c978f;
      --card: #222327;
      --border: rgba(236, 235, 232, 0.08);
      --shadow: 0 24px 60px rgba(0, 0, 0, 0.4);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(720px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 24px;
    }

    h1 {
      font-family: "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    .subtitle {
      margin: 6px 0 0;
      color: var(--muted);
    }

    ul {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 12px;
    }

    .habit {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 16px;
      padding: 16px 18px;
      border-radius: 18px;
      border: 1px solid var(--border);
      border-left: 6px solid var(--habit-color);
    }

    .habit.done .habit-name {
      text-decoration: line-through;
      color: var(--muted);
    }

    .habit-main {
      display: grid;
      gap: 4px;
    }

    .habit-name {
      font-weight: 600;
    }

    .habit-meta {
      font-size: 0.85rem;
      color: var(--muted);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-weight: 600;
      cursor: pointer;
      background: var(--habit-color);
      color: white;
    }

    .habit.done button {
      background: transparent;
      color: var(--muted);
      border: 1px solid var(--border);
    }

    .empty {
      color: var(--muted);
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Today</h1>
      <p class="subtitle">{{DATE}} &middot; {{DONE}} of {{TOTAL}} done</p>
    </header>
    <ul>
      {{HABITS}}
    </ul>
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tea" & 'toast'</b>"#),
            "&lt;b&gt;&quot;Tea&quot; &amp; &#39;toast&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn empty_day_renders_placeholder() {
        let today = TodayResponse {
            date: "2026-01-05".parse().unwrap(),
            habits: Vec::new(),
            completed: 0,
            total: 0,
        };
        let html = render_index(&today, true);
        assert!(html.contains("Nothing due today"));
        assert!(html.contains(r#"data-theme="dark""#));
        assert!(html.contains("0 of 0 done"));
    }
}
