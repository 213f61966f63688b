//! ConversationEngine: applies one event to a user's session and produces
//! the replies.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::channels::{Delivery, OutgoingResponse, ReplyMarkup};
use crate::directory::model::{EmployeeMatch, ExternalId};
use crate::directory::pagination::PageWindow;
use crate::error::{DatabaseError, FlowError, SelectionError};
use crate::presentation::{format, keyboards};
use crate::store::Database;

use super::event::{Callback, Event, MenuCommand};
use super::selection;
use super::session::SessionStore;
use super::state::{ConversationState, Session, SessionData};

/// Drives registration, listing, search and schedule lookups.
///
/// Flow errors are answered in-band. Only storage faults escape `handle`.
pub struct ConversationEngine {
    db: Arc<dyn Database>,
    sessions: Arc<dyn SessionStore>,
    page_size: u32,
}

impl ConversationEngine {
    pub fn new(db: Arc<dyn Database>, sessions: Arc<dyn SessionStore>, page_size: u32) -> Self {
        Self {
            db,
            sessions,
            page_size,
        }
    }

    /// Current dialogue state of a user.
    pub async fn state_of(&self, user: ExternalId) -> Result<ConversationState, DatabaseError> {
        Ok(self.sessions.load(user).await?.state)
    }

    /// Process one event for `user` and return the replies in send order.
    pub async fn handle(
        &self,
        user: ExternalId,
        event: Event,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        let mut session = self.sessions.load(user).await?;
        let before = session.state;

        let replies = match event {
            Event::Start => {
                session.reset();
                vec![self.start(user).await?]
            }
            Event::Callback(callback) => self.on_callback(&mut session, callback).await?,
            Event::Text(text) => self.on_text(user, &mut session, &text).await?,
            Event::UnknownCallback(data) => {
                warn!(user, data = %data, "Ignoring unknown callback");
                Vec::new()
            }
        };

        self.sessions.save(user, &session).await?;
        debug!(user, from = %before, to = %session.state, replies = replies.len(), "Event handled");
        Ok(replies)
    }

    /// Move `session` to `target` and run the target's entry action.
    fn enter(&self, session: &mut Session, target: ConversationState) -> Vec<OutgoingResponse> {
        if let Err(e) = session.transition_to(target) {
            warn!("{e}; resetting dialogue");
            session.reset();
            return Vec::new();
        }
        match target {
            ConversationState::AwaitingFio => {
                vec![OutgoingResponse::text(format::ASK_FIO).with_markup(ReplyMarkup::Remove)]
            }
            ConversationState::AwaitingCompanyId => {
                vec![OutgoingResponse::text(format::ASK_COMPANY_ID)]
            }
            ConversationState::AwaitingSearchFio => {
                vec![OutgoingResponse::text(format::ASK_SEARCH_FIO)]
            }
            ConversationState::Idle | ConversationState::AwaitingSelectionIndex => Vec::new(),
        }
    }

    async fn start(&self, user: ExternalId) -> Result<OutgoingResponse, DatabaseError> {
        if self.db.user_exists(user).await? {
            Ok(OutgoingResponse::text(format::MENU_GREETING).with_markup(keyboards::main_menu()))
        } else {
            Ok(OutgoingResponse::text(format::REGISTRATION_OFFER)
                .with_markup(keyboards::registration()))
        }
    }

    async fn on_callback(
        &self,
        session: &mut Session,
        callback: Callback,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        match callback {
            Callback::RegisterYes => {
                session.reset();
                let replies = self.enter(session, ConversationState::AwaitingFio);
                Ok(close_original(replies))
            }
            Callback::RegisterNo => {
                session.reset();
                Ok(vec![OutgoingResponse::text(format::REGISTRATION_CANCELLED)
                    .with_markup(ReplyMarkup::Remove)
                    .with_delivery(Delivery::SendAndCloseOriginal)])
            }
            Callback::Page(page) => Ok(vec![self
                .employee_page(page)
                .await?
                .with_delivery(Delivery::EditOriginal)]),
            Callback::WorkSchedule(employee_id) => {
                let schedule = self.db.get_work_schedule(employee_id).await?;
                if schedule.is_none() {
                    debug!(employee_id, "No work schedule on file");
                }
                Ok(vec![OutgoingResponse::text(format::work_schedule(
                    schedule.as_ref(),
                ))
                .with_delivery(Delivery::SendAndCloseOriginal)])
            }
        }
    }

    async fn on_text(
        &self,
        user: ExternalId,
        session: &mut Session,
        text: &str,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        match session.state {
            ConversationState::Idle => self.on_menu(user, session, text).await,
            ConversationState::AwaitingFio => {
                session.data.pending_fio = Some(text.trim().to_string());
                Ok(self.enter(session, ConversationState::AwaitingCompanyId))
            }
            ConversationState::AwaitingCompanyId => {
                self.complete_registration(user, session, text).await
            }
            ConversationState::AwaitingSearchFio => self.search(session, text).await,
            ConversationState::AwaitingSelectionIndex => self.select(session, text).await,
        }
    }

    async fn on_menu(
        &self,
        user: ExternalId,
        session: &mut Session,
        text: &str,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        let Some(command) = MenuCommand::from_label(text) else {
            debug!(user, "Ignoring text outside a dialogue");
            return Ok(Vec::new());
        };

        match command {
            MenuCommand::EmployeeList => {
                if !self.db.user_exists(user).await? {
                    return Ok(vec![not_registered()]);
                }
                Ok(vec![self.employee_page(1).await?])
            }
            MenuCommand::SearchByFio => {
                Ok(self.enter(session, ConversationState::AwaitingSearchFio))
            }
            MenuCommand::MySchedule => {
                let Some(employee) = self.db.find_employee_by_external_id(user).await? else {
                    return Ok(vec![not_registered()]);
                };
                let schedule = self.db.get_work_schedule(employee.id).await?;
                Ok(vec![OutgoingResponse::text(format::work_schedule(
                    schedule.as_ref(),
                ))
                .with_markup(keyboards::main_menu())])
            }
        }
    }

    async fn complete_registration(
        &self,
        user: ExternalId,
        session: &mut Session,
        text: &str,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        let fio = session.data.pending_fio.clone().unwrap_or_default();
        let linked = match text.trim().parse::<i64>() {
            Ok(company_id) => self.db.link_employee(user, &fio, company_id).await?,
            Err(_) => false,
        };

        if linked {
            info!(user, "Employee registered");
            let mut replies = self.enter(session, ConversationState::Idle);
            replies.push(
                OutgoingResponse::text(format::registration_success(&fio))
                    .with_markup(keyboards::main_menu()),
            );
            return Ok(replies);
        }

        let err = FlowError::EmployeeNotFound;
        debug!(user, error = %err, "Registration failed");
        session.data = SessionData::default();
        let mut replies = vec![OutgoingResponse::text(format::flow_error(&err))];
        replies.extend(self.enter(session, ConversationState::AwaitingFio));
        Ok(replies)
    }

    async fn search(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        let query = query.trim();
        let matches = self.db.search_by_full_name(query).await?;

        let replies = match matches.as_slice() {
            [] => {
                let mut replies = self.enter(session, ConversationState::Idle);
                replies.push(
                    OutgoingResponse::text(format::flow_error(&FlowError::NoMatch))
                        .with_markup(keyboards::main_menu()),
                );
                replies
            }
            [only] => {
                let mut replies = self.enter(session, ConversationState::Idle);
                replies.push(employee_detail(only));
                replies
            }
            candidates => {
                session.data.pending_search = Some(query.to_string());
                let mut replies = self.enter(session, ConversationState::AwaitingSelectionIndex);
                replies.push(OutgoingResponse::text(format::candidate_list(candidates)));
                replies
            }
        };
        Ok(replies)
    }

    async fn select(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<Vec<OutgoingResponse>, DatabaseError> {
        let index = match selection::parse_index(input) {
            Ok(index) => index,
            Err(e) => return Ok(self.reprompt_selection(session, e)),
        };

        // The candidate list is looked up again rather than cached in the session.
        let query = session.data.pending_search.clone().unwrap_or_default();
        let matches = self.db.search_by_full_name(&query).await?;

        match selection::resolve_index(index, matches.len()) {
            Ok(position) => {
                let reply = employee_detail(&matches[position]);
                let mut replies = self.enter(session, ConversationState::Idle);
                replies.push(reply);
                Ok(replies)
            }
            Err(e) => Ok(self.reprompt_selection(session, e)),
        }
    }

    fn reprompt_selection(
        &self,
        session: &mut Session,
        err: SelectionError,
    ) -> Vec<OutgoingResponse> {
        let mut replies = self.enter(session, ConversationState::AwaitingSelectionIndex);
        replies.push(OutgoingResponse::text(format::flow_error(
            &FlowError::InvalidSelection(err),
        )));
        replies
    }

    async fn employee_page(&self, page: u32) -> Result<OutgoingResponse, DatabaseError> {
        let total = self.db.count_employees().await?;
        let window = PageWindow::new(page, self.page_size, total);
        let employees = self.db.list_employees_page(page, self.page_size).await?;

        let response = OutgoingResponse::text(format::employee_page(&employees, &window));
        Ok(match keyboards::pagination(&window) {
            Some(markup) => response.with_markup(markup),
            None => response,
        })
    }
}

fn not_registered() -> OutgoingResponse {
    OutgoingResponse::text(format::flow_error(&FlowError::NotRegistered))
        .with_markup(keyboards::registration())
}

fn employee_detail(employee: &EmployeeMatch) -> OutgoingResponse {
    OutgoingResponse::text(format::employee_detail(employee))
        .with_markup(keyboards::schedule_prompt(employee.id))
}

/// Strip the buttons of the pressed message along with the first reply.
fn close_original(mut replies: Vec<OutgoingResponse>) -> Vec<OutgoingResponse> {
    if let Some(first) = replies.first_mut() {
        first.delivery = Delivery::SendAndCloseOriginal;
    }
    replies
}
