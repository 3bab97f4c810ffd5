use std::path::PathBuf;

use chrono::NaiveDate;

use folio::commands::*;
use folio::config::Config;
use folio::models::{ClientStatus, Priority, ProjectStatus, TaskStatus};
use folio::notify::{Level, Notice, NoticeBuffer};
use folio::services::{ClientService, ProjectDraft, ProjectService, TimeEntryService};
use folio::session::{AccessPolicy, Identity, Session};
use folio::store::{Document, DocumentStore, Fields, JsonFileStore, StoreError, Subscription};
use folio::view::{ClientForm, ProjectEditForm, TaskForm};
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    store: JsonFileStore,
    notices: NoticeBuffer,
    session: Session,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let session = AccessPolicy::new(["owner@folio.test"])
            .authorize(Some(Identity { email: "owner@folio.test".into(), display_name: Some("Olive".into()) }))
            .unwrap();
        let config = Config::from_lookup(Some(dir.path()), |_| None).unwrap();
        Fixture { dir, store, notices: NoticeBuffer::default(), session, config }
    }

    fn ctx(&self) -> Context<'_> {
        Context::new(&self.store, &self.notices, &self.session, &self.config)
    }

    fn errors(&self) -> Vec<String> {
        self.notices.take().into_iter().filter(|n| n.level == Level::Error).map(|n| n.message).collect()
    }
}

fn acme() -> ClientForm {
    ClientForm {
        name: "Acme".into(),
        email: "hi@acme.test".into(),
        company: "Acme Corp".into(),
        ..Default::default()
    }
}

fn titled(title: &str) -> ProjectDraft {
    ProjectDraft { title: Some(title.into()), ..Default::default() }
}

/// A store whose every operation fails, like an unreachable backend.
struct BrokenStore;

impl BrokenStore {
    fn err() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("/unreachable"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
    }
}

impl DocumentStore for BrokenStore {
    fn list(&self, _: &str) -> Result<Vec<Document>, StoreError> {
        Err(Self::err())
    }
    fn insert(&self, _: &str, _: Fields) -> Result<String, StoreError> {
        Err(Self::err())
    }
    fn update(&self, _: &str, _: &str, _: Fields) -> Result<(), StoreError> {
        Err(Self::err())
    }
    fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(Self::err())
    }
    fn batch_insert(&self, _: &str, _: Vec<Fields>) -> Result<Vec<String>, StoreError> {
        Err(Self::err())
    }
    fn subscribe(&self, _: &str) -> Result<Subscription, StoreError> {
        Err(Self::err())
    }
}

#[test]
fn test_client_add_and_list() {
    let fx = Fixture::new();
    let id = cmd_client_add(&fx.ctx(), acme()).expect("client saved");

    let clients = ClientService::new(&fx.store, &fx.notices).list_clients();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, id);
    assert_eq!(clients[0].company, "Acme Corp");
    assert_eq!(clients[0].status, ClientStatus::Active);
    assert_eq!(clients[0].project_count, 0);
    assert!(fx.errors().is_empty());
    assert!(fx.dir.path().join("clients.json").exists());
}

#[test]
fn test_invalid_client_is_not_written() {
    let fx = Fixture::new();
    let form = ClientForm { company: String::new(), ..acme() };
    assert_eq!(cmd_client_add(&fx.ctx(), form), None);

    let errors = fx.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("company"));
    assert!(ClientService::new(&fx.store, &fx.notices).list_clients().is_empty());
}

#[test]
fn test_client_edit_keeps_counters() {
    let fx = Fixture::new();
    cmd_clients_seed(&fx.ctx());
    let clients = ClientService::new(&fx.store, &fx.notices).list_clients();
    let target = clients.iter().find(|c| c.name == "Acme Corporation").unwrap();

    let changes = ClientChanges {
        status: Some(ClientStatus::Inactive),
        phone: Some(String::new()),
        ..Default::default()
    };
    cmd_client_edit(&fx.ctx(), &target.id[..8], changes);

    let after = ClientService::new(&fx.store, &fx.notices).list_clients();
    let edited = after.iter().find(|c| c.id == target.id).unwrap();
    assert_eq!(edited.status, ClientStatus::Inactive);
    assert_eq!(edited.phone, None);
    assert_eq!(edited.project_count, target.project_count);
    assert_eq!(edited.total_value, target.total_value);
    assert!(fx.errors().is_empty());
}

#[test]
fn test_deleting_client_leaves_projects_alone() {
    let fx = Fixture::new();
    let client_id = cmd_client_add(&fx.ctx(), acme()).unwrap();
    let draft = ProjectDraft { title: Some("Relaunch".into()), client: Some("Acme Corp".into()), ..Default::default() };
    cmd_project_add(&fx.ctx(), draft).unwrap();

    cmd_client_remove(&fx.ctx(), &client_id);

    assert!(ClientService::new(&fx.store, &fx.notices).list_clients().is_empty());
    let projects = ProjectService::new(&fx.store, &fx.notices).list_projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].client, "Acme Corp");
}

#[test]
fn test_empty_project_list_is_not_an_error() {
    let fx = Fixture::new();
    cmd_projects(&fx.ctx());
    cmd_my_tasks(&fx.ctx());
    assert!(fx.notices.take().is_empty());
}

#[test]
fn test_broken_store_lists_nothing_and_reports() {
    let fx = Fixture::new();
    let broken = BrokenStore;
    let ctx = Context::new(&broken, &fx.notices, &fx.session, &fx.config);

    assert!(ProjectService::new(&broken, &fx.notices).list_projects().is_empty());
    assert_eq!(fx.notices.last(), Some(Notice::error("Failed to load projects")));

    assert_eq!(cmd_client_add(&ctx, acme()), None);
    assert_eq!(fx.notices.last(), Some(Notice::error("Failed to save client")));
}

#[test]
fn test_task_add_and_move() {
    let fx = Fixture::new();
    let project_id = cmd_project_add(&fx.ctx(), titled("Site")).unwrap();

    let form = TaskForm {
        name: "Wireframes".into(),
        project_id: project_id[..8].to_string(),
        due: "2030-01-15".into(),
        ..Default::default()
    };
    let task_id = cmd_task_add(&fx.ctx(), form).expect("task added");
    cmd_task_move(&fx.ctx(), &task_id[..8], TaskStatus::InProgress);

    let project = ProjectService::new(&fx.store, &fx.notices).get_project(&project_id).unwrap().unwrap();
    assert_eq!(project.tasks.len(), 1);
    assert_eq!(project.tasks[0].assignee, "Unassigned");
    assert_eq!(project.tasks[0].status, TaskStatus::InProgress);
    assert_eq!(project.tasks[0].end_date.format("%Y-%m-%d").to_string(), "2030-01-15");
    // The wizard puts the signed-in user first on the team.
    assert_eq!(project.members, vec!["Olive".to_string()]);

    cmd_task_remove(&fx.ctx(), &task_id);
    let project = ProjectService::new(&fx.store, &fx.notices).get_project(&project_id).unwrap().unwrap();
    assert!(project.tasks.is_empty());
    assert!(fx.errors().is_empty());
}

#[test]
fn test_task_for_unknown_project_is_rejected() {
    let fx = Fixture::new();
    let form = TaskForm {
        name: "Orphan".into(),
        project_id: "nope".into(),
        due: "2030-01-15".into(),
        ..Default::default()
    };
    assert_eq!(cmd_task_add(&fx.ctx(), form), None);
    assert_eq!(fx.errors(), vec!["Project 'nope' not found".to_string()]);
}

#[test]
fn test_project_edit_rejects_bad_date() {
    let fx = Fixture::new();
    let id = cmd_project_add(&fx.ctx(), titled("Site")).unwrap();
    let before = ProjectService::new(&fx.store, &fx.notices).get_project(&id).unwrap().unwrap();

    let form = ProjectEditForm { name: "Renamed".into(), end_date: "31/12/2030".into(), ..Default::default() };
    cmd_project_edit(&fx.ctx(), &id, form);
    assert_eq!(fx.errors().len(), 1);
    let after = ProjectService::new(&fx.store, &fx.notices).get_project(&id).unwrap().unwrap();
    assert_eq!(after.name, before.name);

    let form = ProjectEditForm { name: "Renamed".into(), progress: Some(40), ..Default::default() };
    cmd_project_edit(&fx.ctx(), &id, form);
    let after = ProjectService::new(&fx.store, &fx.notices).get_project(&id).unwrap().unwrap();
    assert_eq!(after.name, "Renamed");
    assert_eq!(after.progress, 40);
    assert_eq!(after.end_date, before.end_date);
}

#[test]
fn test_time_log_belongs_to_session_user() {
    let fx = Fixture::new();
    let project_id = cmd_project_add(&fx.ctx(), titled("<b>Site</b>")).unwrap();

    let zero = LogTime { project: project_id.clone(), hours: 0.0, description: None, date: None, billable: true };
    assert_eq!(cmd_time_log(&fx.ctx(), zero), None);
    assert_eq!(fx.errors().len(), 1);

    let log = LogTime {
        project: project_id[..8].to_string(),
        hours: 2.5,
        description: None,
        date: Some("2030-02-01".into()),
        billable: false,
    };
    cmd_time_log(&fx.ctx(), log).expect("entry saved");

    let entries = TimeEntryService::new(&fx.store, &fx.notices).list_time_entries("owner@folio.test");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hours, 2.5);
    assert_eq!(entries[0].description, "Manual entry");
    assert_eq!(entries[0].project_name, "Site");
    assert!(!entries[0].billable);
    assert!(TimeEntryService::new(&fx.store, &fx.notices).list_time_entries("someone@else.test").is_empty());
}

#[test]
fn test_seeded_projects_feed_the_overviews() {
    let fx = Fixture::new();
    cmd_projects_seed(&fx.ctx());
    let projects = ProjectService::new(&fx.store, &fx.notices).list_projects();
    assert_eq!(projects.len(), 3);

    // The read-only views render without raising anything.
    cmd_projects(&fx.ctx());
    cmd_tasks(&fx.ctx());
    cmd_board(&fx.ctx());
    cmd_performance(&fx.ctx());
    cmd_reports(&fx.ctx());
    cmd_calendar(&fx.ctx(), None, folio::derive::calendar::CalendarView::Week);
    cmd_time(&fx.ctx(), None);
    assert!(fx.errors().is_empty());
}

#[test]
fn test_project_table_shows_stored_task_count() {
    let fx = Fixture::new();
    let stored = json!([{
        "id": "p1",
        "name": "Site",
        "startDate": "2030-01-01",
        "endDate": "2030-03-01",
        "progress": 40,
        "taskCount": 12,
        "tasks": [{"id": "t1", "name": "Wireframes", "endDate": "2030-02-01"}]
    }]);
    std::fs::write(fx.dir.path().join("projects.json"), stored.to_string()).unwrap();

    let projects = ProjectService::new(&fx.store, &fx.notices).list_projects();
    assert_eq!(projects[0].tasks.len(), 1);
    let table = project_table(&projects, fx.ctx().today);
    let row = table.row(0).unwrap();
    let cells: Vec<String> = row.cell_iter().map(|c| c.content()).collect();
    assert_eq!(cells[6], "40%");
    assert_eq!(cells[7], "12");
}

#[test]
fn test_invalid_forms_never_reach_the_store() {
    let fx = Fixture::new();
    let broken = BrokenStore;
    let ctx = Context::new(&broken, &fx.notices, &fx.session, &fx.config);

    let nameless = TaskForm { project_id: "p1".into(), due: "2030-01-15".into(), ..Default::default() };
    assert_eq!(cmd_task_add(&ctx, nameless), None);
    let zero = LogTime { project: "p1".into(), hours: 0.0, description: None, date: None, billable: true };
    assert_eq!(cmd_time_log(&ctx, zero), None);

    let errors = fx.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| !e.starts_with("Failed to load")), "{errors:?}");
}

#[test]
fn test_created_project_reads_back_intact() {
    let fx = Fixture::new();
    let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc();
    let draft = ProjectDraft {
        title: Some("Relaunch".into()),
        description: Some("New storefront".into()),
        client: Some("Acme Corp".into()),
        status: Some(ProjectStatus::Active),
        priority: Some(Priority::Urgent),
        start_date: Some(day("2030-01-02")),
        target_date: Some(day("2030-04-01")),
        deadline_date: Some(day("2030-03-15")),
        tags: vec!["web".into(), "retail".into()],
        owner_name: None,
        contributor_names: vec!["Lee".into()],
        intent: Some("Website".into()),
        add_starter_tasks: true,
    };
    let id = cmd_project_add(&fx.ctx(), draft).unwrap();

    let projects = ProjectService::new(&fx.store, &fx.notices).list_projects();
    assert_eq!(projects.len(), 1);
    let p = &projects[0];
    assert_eq!(p.id, id);
    assert_eq!(p.name, "Relaunch");
    assert_eq!(p.description, "New storefront");
    assert_eq!(p.client, "Acme Corp");
    assert_eq!(p.status, ProjectStatus::Active);
    assert_eq!(p.priority, Priority::Urgent);
    assert_eq!(p.tags, vec!["web".to_string(), "retail".to_string()]);
    assert_eq!(p.members, vec!["Olive".to_string(), "Lee".to_string()]);
    assert_eq!(p.type_label, "Website");
    assert_eq!(p.start_date.date_naive(), day("2030-01-02").date_naive());
    assert_eq!(p.end_date.date_naive(), day("2030-03-15").date_naive());
    assert_eq!(p.tasks.len(), 1);
    assert_eq!(p.tasks[0].name, "Kickoff meeting");
    assert_eq!(p.tasks[0].status, TaskStatus::Todo);
}

#[test]
fn test_logged_time_reads_back_intact() {
    let fx = Fixture::new();
    let project_id = cmd_project_add(&fx.ctx(), titled("Site")).unwrap();
    let log = LogTime {
        project: project_id.clone(),
        hours: 1.75,
        description: Some("Design review".into()),
        date: Some("2030-02-03".into()),
        billable: true,
    };
    let id = cmd_time_log(&fx.ctx(), log).unwrap();

    let entries = TimeEntryService::new(&fx.store, &fx.notices).list_time_entries("owner@folio.test");
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.id, id);
    assert_eq!(e.project_id, project_id);
    assert_eq!(e.project_name, "Site");
    assert_eq!(e.description, "Design review");
    assert_eq!(e.hours, 1.75);
    assert!(e.billable);
    assert_eq!(e.date.date_naive(), NaiveDate::from_ymd_opt(2030, 2, 3).unwrap());
}
