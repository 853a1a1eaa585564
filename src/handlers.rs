use crate::achievements::{achievements_in, Achievement, AchievementStats, ACHIEVEMENTS};
use crate::ai::{
    analyze_sentiment, generate_coaching as request_coaching, milestone_message, CoachingContext,
};
use crate::coaching::CoachingMessage;
use crate::dates::{today, DateKey};
use crate::errors::AppError;
use crate::habits::{Habit, HabitPatch, HabitStore, NewHabit};
use crate::journal::{JournalEntry, SentimentAnalysis};
use crate::ledger::{CheckIn, Mood};
use crate::milestone::{next_milestone, progress_percent};
use crate::models::{
    AchievementQuery, AchievementView, AchievementsResponse, AppData, CheckInListResponse,
    CheckInQuery, CoachingQuery, CoachingResponse, CreateHabitResponse, HabitListQuery,
    HabitView, JournalListResponse, JournalQuery, JournalRequest, JournalUpdate, MoodRequest,
    NoteRequest, Notice, NoticeKind, Preferences, PreferencesUpdate, StatsResponse,
    StreakResponse, TodayResponse, ToggleRequest, ToggleResponse,
};
use crate::state::AppState;
use crate::stats::build_stats_at;
use crate::storage::Namespace;
use crate::streak::Streak;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    Json,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

const SENTIMENT_FAILED: &str = "AI analysis failed, but entry is saved";

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let today = today();
    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today);
    let view = today_view(&data.habits, today);
    Html(render_index(&view, data.preferences.dark_mode))
}

pub async fn toggle_form(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Redirect, AppError> {
    apply_toggle(&state, &habit_id, today()).await?;
    Ok(Redirect::to("/"))
}

pub async fn get_today(State(state): State<AppState>) -> Json<TodayResponse> {
    let today = today();
    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today);
    Json(today_view(&data.habits, today))
}

pub async fn list_habits(
    State(state): State<AppState>,
    Query(query): Query<HabitListQuery>,
) -> Json<Vec<Habit>> {
    let data = state.data.lock().await;
    let habits = if query.archived {
        data.habits.archived_habits().cloned().collect()
    } else {
        data.habits.active_habits().cloned().collect()
    };
    Json(habits)
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<NewHabit>,
) -> Result<(StatusCode, Json<CreateHabitResponse>), AppError> {
    let (today, now) = (today(), Utc::now());
    let mut data = state.data.lock().await;
    let habit = data.habits.add_habit(payload, now)?;
    let unlocked_achievements = unlock_achievements(&mut data, today, now);
    state
        .persist(&data, &[Namespace::Habits, Namespace::Achievements])
        .await?;
    info!(habit_id = %habit.id, name = %habit.name, "created habit");

    Ok((
        StatusCode::CREATED,
        Json(CreateHabitResponse {
            habit,
            unlocked_achievements,
        }),
    ))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<HabitView>, AppError> {
    let today = today();
    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today);
    let habit = data.habits.habit(&habit_id).ok_or_else(|| habit_not_found(&habit_id))?;
    Ok(Json(habit_view(&data.habits, habit, today)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(patch): Json<HabitPatch>,
) -> Result<Json<Habit>, AppError> {
    let mut data = state.data.lock().await;
    let habit = data
        .habits
        .update_habit(&habit_id, patch, today())?
        .ok_or_else(|| habit_not_found(&habit_id))?;
    state.persist(&data, &[Namespace::Habits]).await?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    if !data.habits.delete_habit(&habit_id) {
        return Err(habit_not_found(&habit_id));
    }
    state.persist(&data, &[Namespace::Habits]).await?;
    info!(habit_id = %habit_id, "deleted habit");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    set_archived(&state, &habit_id, true).await
}

pub async fn restore_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    set_archived(&state, &habit_id, false).await
}

async fn set_archived(
    state: &AppState,
    habit_id: &str,
    archived: bool,
) -> Result<Json<Habit>, AppError> {
    let mut data = state.data.lock().await;
    let habit = if archived {
        data.habits.archive_habit(habit_id)
    } else {
        data.habits.restore_habit(habit_id)
    }
    .cloned()
    .ok_or_else(|| habit_not_found(habit_id))?;
    state.persist(&data, &[Namespace::Habits]).await?;
    Ok(Json(habit))
}

pub async fn list_check_ins(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Query(query): Query<CheckInQuery>,
) -> Result<Json<CheckInListResponse>, AppError> {
    let from = parse_optional_date(query.from.as_deref())?;
    let to = parse_optional_date(query.to.as_deref())?;
    let data = state.data.lock().await;
    if data.habits.habit(&habit_id).is_none() {
        return Err(habit_not_found(&habit_id));
    }
    let mut check_ins: Vec<CheckIn> = data
        .habits
        .check_ins_for(&habit_id)
        .filter(|record| from.is_none_or(|from| record.date >= from))
        .filter(|record| to.is_none_or(|to| record.date <= to))
        .cloned()
        .collect();
    check_ins.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(CheckInListResponse {
        habit_id,
        check_ins,
    }))
}

pub async fn toggle_check_in(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    payload: Option<Json<ToggleRequest>>,
) -> Result<Json<ToggleResponse>, AppError> {
    let today = today();
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let date = parse_optional_date(request.date.as_deref())?.unwrap_or(today);
    let response = apply_toggle(&state, &habit_id, date).await?;
    Ok(Json(response))
}

pub async fn get_streak(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<StreakResponse>, AppError> {
    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today());
    let streak = data
        .habits
        .streak(&habit_id)
        .cloned()
        .ok_or_else(|| habit_not_found(&habit_id))?;
    Ok(Json(StreakResponse {
        next_milestone: next_milestone(streak.current_streak),
        milestone_progress: progress_percent(streak.current_streak),
        streak,
    }))
}

pub async fn set_mood(
    State(state): State<AppState>,
    Path(check_in_id): Path<String>,
    Json(payload): Json<MoodRequest>,
) -> Result<Json<CheckIn>, AppError> {
    let mood = Mood::new(payload.mood)
        .ok_or_else(|| AppError::bad_request("mood must be between 1 and 5"))?;
    let mut data = state.data.lock().await;
    let check_in = data
        .habits
        .set_mood(&check_in_id, mood)
        .cloned()
        .ok_or_else(|| check_in_not_found(&check_in_id))?;
    state.persist(&data, &[Namespace::Habits]).await?;
    Ok(Json(check_in))
}

pub async fn set_note(
    State(state): State<AppState>,
    Path(check_in_id): Path<String>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<CheckIn>, AppError> {
    let mut data = state.data.lock().await;
    let check_in = data
        .habits
        .set_note(&check_in_id, payload.note)
        .cloned()
        .ok_or_else(|| check_in_not_found(&check_in_id))?;
    state.persist(&data, &[Namespace::Habits]).await?;
    Ok(Json(check_in))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let today = today();
    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today);
    Json(build_stats_at(today, &data.habits, &data.journal))
}

pub async fn get_achievements(
    State(state): State<AppState>,
    Query(query): Query<AchievementQuery>,
) -> Json<AchievementsResponse> {
    let data = state.data.lock().await;
    let book = &data.achievements;
    let catalog: Vec<&Achievement> = match query.category {
        Some(category) => achievements_in(category).collect(),
        None => ACHIEVEMENTS.iter().collect(),
    };
    let achievements = catalog
        .into_iter()
        .map(|achievement| {
            let progress = book.progress(achievement.id);
            AchievementView {
                id: achievement.id,
                name: achievement.name,
                description: achievement.description,
                category: achievement.category,
                icon: achievement.icon,
                color: achievement.color,
                requirement: achievement.requirement,
                unlocked: progress.is_some_and(|progress| progress.is_unlocked),
                unlocked_at: progress.and_then(|progress| progress.unlocked_at),
            }
        })
        .collect();

    Json(AchievementsResponse {
        unlocked: book.unlocked_count(),
        total: book.total_count(),
        achievements,
    })
}

pub async fn list_journal(
    State(state): State<AppState>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<JournalListResponse>, AppError> {
    let date = parse_optional_date(query.date.as_deref())?;
    let from = parse_optional_date(query.from.as_deref())?;
    let to = parse_optional_date(query.to.as_deref())?;
    let data = state.data.lock().await;
    if let Some(date) = date {
        let entries = data.journal.by_date(date).cloned().into_iter().collect();
        return Ok(Json(JournalListResponse { entries }));
    }
    let mut entries: Vec<JournalEntry> = match (from, to) {
        (None, None) => data.journal.recent(data.journal.len()),
        (from, to) => data.journal.in_range(
            from.unwrap_or(DateKey::new(chrono::NaiveDate::MIN)),
            to.unwrap_or(DateKey::new(chrono::NaiveDate::MAX)),
        ),
    }
    .into_iter()
    .cloned()
    .collect();
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    Ok(Json(JournalListResponse { entries }))
}

pub async fn create_journal(
    State(state): State<AppState>,
    Json(payload): Json<JournalRequest>,
) -> Result<(StatusCode, Json<JournalEntry>), AppError> {
    let date = parse_optional_date(payload.date.as_deref())?.unwrap_or_else(today);
    let mut data = state.data.lock().await;
    let entry = data.journal.add(date, &payload.content, Utc::now())?;
    state.persist(&data, &[Namespace::Journal]).await?;
    drop(data);

    spawn_sentiment_analysis(state.clone(), entry.id.clone(), entry.content.clone());
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_journal(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Json(payload): Json<JournalUpdate>,
) -> Result<Json<JournalEntry>, AppError> {
    let mut data = state.data.lock().await;
    let entry = data
        .journal
        .update_content(&entry_id, &payload.content, Utc::now())?
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("journal entry '{entry_id}' not found")))?;
    state.persist(&data, &[Namespace::Journal]).await?;
    drop(data);

    if entry.sentiment.is_none() {
        spawn_sentiment_analysis(state.clone(), entry.id.clone(), entry.content.clone());
    }
    Ok(Json(entry))
}

pub async fn delete_journal(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    if !data.journal.delete(&entry_id) {
        return Err(AppError::not_found(format!("journal entry '{entry_id}' not found")));
    }
    state.persist(&data, &[Namespace::Journal]).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_coaching(
    State(state): State<AppState>,
    Query(query): Query<CoachingQuery>,
) -> Json<CoachingResponse> {
    let data = state.data.lock().await;
    let coaching = &data.coaching;
    let limit = query.limit.unwrap_or(coaching.messages().len());
    Json(CoachingResponse {
        messages: coaching.recent(limit).into_iter().cloned().collect(),
        unread: coaching.unread().count(),
        can_generate: coaching.can_generate_new(Utc::now()),
        next_generation_at: coaching.next_generation_at(),
    })
}

pub async fn generate_coaching(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CoachingMessage>), AppError> {
    let today = today();
    let context = {
        let mut data = state.data.lock().await;
        ensure_can_generate(&data, Utc::now())?;
        data.habits.ensure_fresh(today);
        CoachingContext::gather(&data.habits, &data.journal, today)
    };

    let reply = request_coaching(state.model.as_ref(), &context)
        .await
        .map_err(|err| {
            warn!("coaching generation failed: {err}");
            AppError::bad_gateway(err)
        })?;

    let now = Utc::now();
    let mut data = state.data.lock().await;
    // Another request may have generated while the model was working.
    ensure_can_generate(&data, now)?;
    let message = data
        .coaching
        .add(reply.kind, reply.message, reply.related_habit_ids, now)
        .clone();
    state.persist(&data, &[Namespace::Coaching]).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

fn ensure_can_generate(data: &AppData, now: DateTime<Utc>) -> Result<(), AppError> {
    if data.coaching.can_generate_new(now) {
        return Ok(());
    }
    let retry = data
        .coaching
        .next_generation_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_default();
    Err(AppError::too_many_requests(format!(
        "coaching was generated recently; try again after {retry}"
    )))
}

pub async fn mark_all_coaching_read(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    data.coaching.mark_all_read();
    state.persist(&data, &[Namespace::Coaching]).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_coaching_read(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    if !data.coaching.mark_read(&message_id) {
        return Err(message_not_found(&message_id));
    }
    state.persist(&data, &[Namespace::Coaching]).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_coaching(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    if !data.coaching.delete(&message_id) {
        return Err(message_not_found(&message_id));
    }
    state.persist(&data, &[Namespace::Coaching]).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drop every coaching message and reset the generation window.
pub async fn clear_coaching(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    data.coaching.clear();
    state.persist(&data, &[Namespace::Coaching]).await?;
    info!("cleared coaching messages");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn drain_notifications(State(state): State<AppState>) -> Json<Vec<Notice>> {
    let mut data = state.data.lock().await;
    Json(std::mem::take(&mut data.notices))
}

pub async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    let data = state.data.lock().await;
    Json(data.preferences.clone())
}

pub async fn put_preferences(
    State(state): State<AppState>,
    Json(payload): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>, AppError> {
    let mut data = state.data.lock().await;
    data.preferences.dark_mode = payload.dark_mode;
    state.persist(&data, &[Namespace::Preferences]).await?;
    Ok(Json(data.preferences.clone()))
}

async fn apply_toggle(
    state: &AppState,
    habit_id: &str,
    date: DateKey,
) -> Result<ToggleResponse, AppError> {
    let (today, now) = (today(), Utc::now());
    if date > today {
        return Err(AppError::bad_request("cannot check in on a future date"));
    }

    let mut data = state.data.lock().await;
    data.habits.ensure_fresh(today);
    let outcome = data
        .habits
        .toggle_check_in(habit_id, date, now, today)
        .ok_or_else(|| habit_not_found(habit_id))?;
    let unlocked_achievements = unlock_achievements(&mut data, today, now);
    state
        .persist(&data, &[Namespace::Habits, Namespace::Achievements])
        .await?;
    debug!(
        habit_id,
        %date,
        completed = outcome.check_in.completed,
        current_streak = outcome.streak.current_streak,
        "toggled check-in"
    );

    if let Some(days) = outcome.milestone {
        let habit_name = data
            .habits
            .habit(habit_id)
            .map(|habit| habit.name.clone())
            .unwrap_or_default();
        spawn_milestone_message(state.clone(), habit_name, days);
    }

    Ok(ToggleResponse {
        outcome,
        unlocked_achievements,
    })
}

fn unlock_achievements(data: &mut AppData, today: DateKey, now: DateTime<Utc>) -> Vec<String> {
    let stats = AchievementStats::collect(&data.habits, today);
    let unlocked = data.achievements.check_and_unlock(&stats, now);
    for achievement in &unlocked {
        data.notify(
            NoticeKind::Achievement,
            format!("Achievement unlocked: {}", achievement.name),
            now,
        );
    }
    unlocked
        .into_iter()
        .map(|achievement| achievement.id.to_string())
        .collect()
}

fn spawn_milestone_message(state: AppState, habit_name: String, days: u32) {
    tokio::spawn(async move {
        let message = milestone_message(state.model.as_ref(), &habit_name, days).await;
        let mut data = state.data.lock().await;
        data.notify(NoticeKind::Milestone, message, Utc::now());
    });
}

fn spawn_sentiment_analysis(state: AppState, entry_id: String, content: String) {
    tokio::spawn(async move {
        let result = analyze_sentiment(state.model.as_ref(), &content).await;
        let now = Utc::now();
        let mut data = state.data.lock().await;

        let judgment = match result {
            Ok(judgment) => judgment,
            Err(err) => {
                warn!(entry_id = %entry_id, "sentiment analysis failed: {err}");
                data.notify(NoticeKind::Error, SENTIMENT_FAILED, now);
                return;
            }
        };

        // Edited or deleted while the model was working.
        let current = data
            .journal
            .get(&entry_id)
            .is_some_and(|entry| entry.content == content);
        if !current {
            debug!(entry_id = %entry_id, "discarding stale sentiment");
            return;
        }

        data.journal.attach_sentiment(
            &entry_id,
            SentimentAnalysis {
                score: judgment.score,
                label: judgment.label,
                confidence: judgment.confidence,
                themes: judgment.themes,
                analyzed_at: now,
            },
        );
        if let Err(err) = state.persist(&data, &[Namespace::Journal]).await {
            error!("failed to persist sentiment: {err}");
        }
    });
}

fn today_view(store: &HabitStore, today: DateKey) -> TodayResponse {
    let habits: Vec<HabitView> = store
        .due_on(today)
        .into_iter()
        .map(|habit| habit_view(store, habit, today))
        .collect();
    let completed = habits.iter().filter(|view| view.completed_today).count();
    TodayResponse {
        date: today,
        total: habits.len(),
        completed,
        habits,
    }
}

fn habit_view(store: &HabitStore, habit: &Habit, today: DateKey) -> HabitView {
    let streak = store
        .streak(&habit.id)
        .cloned()
        .unwrap_or_else(|| Streak::empty(&habit.id));
    HabitView {
        habit: habit.clone(),
        completed_today: store
            .check_in_on(&habit.id, today)
            .is_some_and(|record| record.completed),
        next_milestone: next_milestone(streak.current_streak),
        milestone_progress: progress_percent(streak.current_streak),
        streak,
    }
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<DateKey>, AppError> {
    Ok(raw.map(str::parse::<DateKey>).transpose()?)
}

fn habit_not_found(id: &str) -> AppError {
    AppError::not_found(format!("habit '{id}' not found"))
}

fn check_in_not_found(id: &str) -> AppError {
    AppError::not_found(format!("check-in '{id}' not found"))
}

fn message_not_found(id: &str) -> AppError {
    AppError::not_found(format!("coaching message '{id}' not found"))
}
