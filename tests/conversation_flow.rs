//! End-to-end conversation scenarios against an in-memory directory.

use std::sync::Arc;

use company_bot::channels::{Delivery, OutgoingResponse, ReplyMarkup};
use company_bot::conversation::{
    Callback, ConversationEngine, ConversationState, DbSessionStore, Event, MemorySessionStore,
};
use company_bot::directory::model::{NewEmployee, WeekShifts};
use company_bot::presentation::{format, keyboards};
use company_bot::store::{Database, LibSqlBackend};

const USER: i64 = 1001;

async fn setup() -> (ConversationEngine, Arc<dyn Database>) {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let engine = ConversationEngine::new(Arc::clone(&db), Arc::new(MemorySessionStore::new()), 5);
    (engine, db)
}

async fn send(engine: &ConversationEngine, text: &str) -> Vec<OutgoingResponse> {
    let event = if text == "/start" {
        Event::Start
    } else {
        Event::Text(text.to_string())
    };
    engine.handle(USER, event).await.unwrap()
}

async fn press(engine: &ConversationEngine, callback: Callback) -> Vec<OutgoingResponse> {
    engine.handle(USER, Event::Callback(callback)).await.unwrap()
}

fn contents(replies: &[OutgoingResponse]) -> Vec<&str> {
    replies.iter().map(|r| r.content.as_str()).collect()
}

async fn state(engine: &ConversationEngine) -> ConversationState {
    engine.state_of(USER).await.unwrap()
}

async fn register(engine: &ConversationEngine, fio: &str, company_id: i64) {
    press(engine, Callback::RegisterYes).await;
    send(engine, fio).await;
    send(engine, &company_id.to_string()).await;
    assert_eq!(state(engine).await, ConversationState::Idle);
}

// ── Registration ────────────────────────────────────────────────────

#[tokio::test]
async fn registration_links_existing_employee() {
    let (engine, db) = setup().await;
    db.insert_employee(&NewEmployee::new("Ivan Ivanov", 42))
        .await
        .unwrap();

    let replies = send(&engine, "/start").await;
    assert_eq!(contents(&replies), [format::REGISTRATION_OFFER]);

    let replies = press(&engine, Callback::RegisterYes).await;
    assert_eq!(contents(&replies), [format::ASK_FIO]);
    assert_eq!(state(&engine).await, ConversationState::AwaitingFio);

    let replies = send(&engine, "Ivan Ivanov").await;
    assert_eq!(contents(&replies), [format::ASK_COMPANY_ID]);
    assert_eq!(state(&engine).await, ConversationState::AwaitingCompanyId);

    let replies = send(&engine, "42").await;
    assert_eq!(
        contents(&replies),
        ["Спасибо за регистрацию, Ivan Ivanov! Ваши данные сохранены."]
    );
    assert_eq!(replies[0].markup, Some(keyboards::main_menu()));
    assert_eq!(state(&engine).await, ConversationState::Idle);
    assert!(db.user_exists(USER).await.unwrap());

    let replies = send(&engine, "/start").await;
    assert_eq!(contents(&replies), [format::MENU_GREETING]);
    assert_eq!(replies[0].markup, Some(keyboards::main_menu()));
}

#[tokio::test]
async fn failed_registration_reprompts_for_full_name() {
    let (engine, db) = setup().await;
    db.insert_employee(&NewEmployee::new("Ivan Ivanov", 42))
        .await
        .unwrap();

    press(&engine, Callback::RegisterYes).await;
    send(&engine, "Ivan Ivanov").await;
    let replies = send(&engine, "43").await;

    assert_eq!(
        contents(&replies),
        [
            "Такого сотрудника не существует, попробуйте зарегистрироваться еще раз",
            format::ASK_FIO,
        ]
    );
    assert_eq!(state(&engine).await, ConversationState::AwaitingFio);
    assert!(!db.user_exists(USER).await.unwrap());

    // Second attempt goes through the same steps
    send(&engine, "Ivan Ivanov").await;
    send(&engine, "42").await;
    assert!(db.user_exists(USER).await.unwrap());
}

// ── Employee list ───────────────────────────────────────────────────

#[tokio::test]
async fn employee_list_requires_registration() {
    let (engine, _db) = setup().await;

    let replies = send(&engine, "Список сотрудников").await;
    assert_eq!(
        contents(&replies),
        ["У вас нет доступа к этой команде, пройдите регистрацию"]
    );
    assert_eq!(replies[0].markup, Some(keyboards::registration()));
    assert_eq!(state(&engine).await, ConversationState::Idle);
}

#[tokio::test]
async fn employee_list_pages_through_directory() {
    let (engine, db) = setup().await;
    for i in 1..=7 {
        db.insert_employee(&NewEmployee::new(format!("E{i}"), i).working(i % 2 == 0))
            .await
            .unwrap();
    }
    register(&engine, "E1", 1).await;

    let replies = send(&engine, "Список сотрудников").await;
    assert_eq!(
        contents(&replies),
        ["Список сотрудников:\n\
          E1 - не работает\nE2 - работает\nE3 - не работает\nE4 - работает\nE5 - не работает\
          \n\nСтраница 1 из 2"]
    );
    assert_eq!(replies[0].delivery, Delivery::Send);
    let buttons: Vec<&str> = replies[0]
        .markup
        .as_ref()
        .unwrap()
        .inline_buttons()
        .map(|b| b.data.as_str())
        .collect();
    assert_eq!(buttons, ["page_2"]);

    let replies = press(&engine, Callback::Page(2)).await;
    assert_eq!(
        contents(&replies),
        ["Список сотрудников:\nE6 - работает\nE7 - не работает\n\nСтраница 2 из 2"]
    );
    assert_eq!(replies[0].delivery, Delivery::EditOriginal);
    let buttons: Vec<&str> = replies[0]
        .markup
        .as_ref()
        .unwrap()
        .inline_buttons()
        .map(|b| b.data.as_str())
        .collect();
    assert_eq!(buttons, ["page_1"]);

    // Past the end renders an empty page without navigation forward
    let replies = press(&engine, Callback::Page(9)).await;
    assert!(replies[0].content.contains(format::EMPTY_LIST));
    assert!(replies[0].content.ends_with("Страница 9 из 2"));
}

// ── Search ──────────────────────────────────────────────────────────

#[tokio::test]
async fn search_without_match_returns_to_menu() {
    let (engine, _db) = setup().await;

    let replies = send(&engine, "Поиск по ФИО").await;
    assert_eq!(contents(&replies), [format::ASK_SEARCH_FIO]);
    assert_eq!(state(&engine).await, ConversationState::AwaitingSearchFio);

    let replies = send(&engine, "Никто Никтович").await;
    assert_eq!(contents(&replies), ["Сотрудник с таким ФИО не найден."]);
    assert_eq!(replies[0].markup, Some(keyboards::main_menu()));
    assert_eq!(state(&engine).await, ConversationState::Idle);
}

#[tokio::test]
async fn search_with_single_match_shows_detail() {
    let (engine, db) = setup().await;
    let id = db
        .insert_employee(
            &NewEmployee::new("Анна Смирнова", 7)
                .with_contacts("+7 900 000-00-07", "anna@example.com")
                .working(true),
        )
        .await
        .unwrap();

    send(&engine, "Поиск по ФИО").await;
    let replies = send(&engine, "Анна Смирнова").await;

    assert_eq!(
        contents(&replies),
        ["Сотрудник: Анна Смирнова\nТелефон: +7 900 000-00-07\nПочта: anna@example.com\nРаботает: Да"]
    );
    assert_eq!(replies[0].markup, Some(keyboards::schedule_prompt(id)));
    assert_eq!(state(&engine).await, ConversationState::Idle);
}

#[tokio::test]
async fn ambiguous_search_is_disambiguated_by_number() {
    let (engine, db) = setup().await;
    let sales = db.insert_department("Продажи").await.unwrap();
    let alpha = db.insert_team("Альфа").await.unwrap();
    db.insert_employee(&NewEmployee::new("Петров Пётр", 1).in_department(sales.id))
        .await
        .unwrap();
    let second = db
        .insert_employee(
            &NewEmployee::new("Петров Пётр", 2)
                .in_team(alpha.id)
                .with_contacts("+7 900 000-00-02", "petrov2@example.com"),
        )
        .await
        .unwrap();

    send(&engine, "Поиск по ФИО").await;
    let replies = send(&engine, "Петров Пётр").await;
    assert_eq!(replies.len(), 1);
    assert!(
        replies[0]
            .content
            .starts_with("Найдено несколько сотрудников. Введите номер нужного:\n\n🔢 1. \n")
    );
    assert!(replies[0].content.contains("🏢 Отдел: Продажи\n👥 Команда: Не указано"));
    assert!(replies[0].content.contains("🔢 2. \n👤 ФИО: Петров Пётр\n🏢 Отдел: Не указано\n👥 Команда: Альфа"));
    assert_eq!(state(&engine).await, ConversationState::AwaitingSelectionIndex);

    let replies = send(&engine, "второй").await;
    assert_eq!(contents(&replies), ["Пожалуйста, введите корректный номер."]);
    assert_eq!(state(&engine).await, ConversationState::AwaitingSelectionIndex);

    for out_of_range in ["0", "3", "-1"] {
        let replies = send(&engine, out_of_range).await;
        assert_eq!(
            contents(&replies),
            ["Неправильный номер. Попробуйте еще раз."],
            "{out_of_range}"
        );
        assert_eq!(state(&engine).await, ConversationState::AwaitingSelectionIndex);
    }

    let replies = send(&engine, "2").await;
    assert_eq!(
        contents(&replies),
        ["Сотрудник: Петров Пётр\nТелефон: +7 900 000-00-02\nПочта: petrov2@example.com\nРаботает: Нет"]
    );
    assert_eq!(replies[0].markup, Some(keyboards::schedule_prompt(second)));
    assert_eq!(state(&engine).await, ConversationState::Idle);
}

#[tokio::test]
async fn selection_sees_directory_changes() {
    let (engine, db) = setup().await;
    db.insert_employee(&NewEmployee::new("Петров Пётр", 1))
        .await
        .unwrap();
    db.insert_employee(&NewEmployee::new("Петров Пётр", 2))
        .await
        .unwrap();

    send(&engine, "Поиск по ФИО").await;
    send(&engine, "Петров Пётр").await;

    // A third namesake appears after the list was shown
    let third = db
        .insert_employee(&NewEmployee::new("Петров Пётр", 3))
        .await
        .unwrap();

    let replies = send(&engine, "3").await;
    assert_eq!(replies[0].markup, Some(keyboards::schedule_prompt(third)));
    assert_eq!(state(&engine).await, ConversationState::Idle);
}

#[tokio::test]
async fn start_abandons_search() {
    let (engine, _db) = setup().await;
    send(&engine, "Поиск по ФИО").await;
    send(&engine, "/start").await;
    assert_eq!(state(&engine).await, ConversationState::Idle);

    // Plain text is no longer taken as a search query
    assert!(send(&engine, "Петров Пётр").await.is_empty());
}

// ── Schedules ───────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_button_shows_schedule() {
    let (engine, db) = setup().await;
    let id = db
        .insert_employee(&NewEmployee::new("Ivan Ivanov", 42))
        .await
        .unwrap();
    db.set_work_schedule(
        id,
        &WeekShifts {
            monday: Some("9:00-18:00".into()),
            sunday: Some("выходной".into()),
            ..WeekShifts::default()
        },
    )
    .await
    .unwrap();

    let replies = press(&engine, Callback::WorkSchedule(id)).await;
    assert_eq!(
        contents(&replies),
        ["Рабочий график для Ivan Ivanov:\n\n\
          Понедельник: 9:00-18:00\n\
          Вторник: Не указано\n\
          Среда: Не указано\n\
          Четверг: Не указано\n\
          Пятница: Не указано\n\
          Суббота: Не указано\n\
          Воскресенье: выходной\n"]
    );
    assert_eq!(replies[0].delivery, Delivery::SendAndCloseOriginal);
}

#[tokio::test]
async fn own_schedule_uses_linked_employee() {
    let (engine, db) = setup().await;
    // Employee ids and chat ids deliberately differ
    db.insert_employee(&NewEmployee::new("Someone Else", 1))
        .await
        .unwrap();
    let id = db
        .insert_employee(&NewEmployee::new("Ivan Ivanov", 42))
        .await
        .unwrap();

    let replies = send(&engine, "Получить рабочий график").await;
    assert_eq!(
        contents(&replies),
        ["У вас нет доступа к этой команде, пройдите регистрацию"]
    );

    register(&engine, "Ivan Ivanov", 42).await;
    let replies = send(&engine, "Получить рабочий график").await;
    assert_eq!(contents(&replies), ["Рабочий график не найден."]);
    assert_eq!(replies[0].markup, Some(keyboards::main_menu()));

    db.set_work_schedule(
        id,
        &WeekShifts {
            friday: Some("10-19".into()),
            ..WeekShifts::default()
        },
    )
    .await
    .unwrap();
    let replies = send(&engine, "Получить рабочий график").await;
    assert!(replies[0].content.starts_with("Рабочий график для Ivan Ivanov:"));
    assert!(replies[0].content.contains("Пятница: 10-19\n"));
}

// ── Callbacks ───────────────────────────────────────────────────────

#[tokio::test]
async fn declining_registration_removes_keyboard() {
    let (engine, _db) = setup().await;
    let replies = press(&engine, Callback::RegisterNo).await;
    assert_eq!(contents(&replies), ["Регистрация отменена."]);
    assert_eq!(replies[0].markup, Some(ReplyMarkup::Remove));
    assert_eq!(replies[0].delivery, Delivery::SendAndCloseOriginal);
}

// ── Persistent sessions ─────────────────────────────────────────────

#[tokio::test]
async fn database_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bot.db");

    {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
        db.insert_employee(&NewEmployee::new("Ivan Ivanov", 42))
            .await
            .unwrap();
        let sessions = Arc::new(DbSessionStore::new(Arc::clone(&db)));
        let engine = ConversationEngine::new(db, sessions, 5);
        press(&engine, Callback::RegisterYes).await;
        send(&engine, "Ivan Ivanov").await;
    }

    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
    let sessions = Arc::new(DbSessionStore::new(Arc::clone(&db)));
    let engine = ConversationEngine::new(Arc::clone(&db), sessions, 5);
    assert_eq!(state(&engine).await, ConversationState::AwaitingCompanyId);

    send(&engine, "42").await;
    assert!(db.user_exists(USER).await.unwrap());
    assert_eq!(db.get_session(USER).await.unwrap(), None);
}
