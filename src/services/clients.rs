use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{Client, ClientStatus};
use crate::notify::Notifier;
use crate::store::{DocumentStore, CLIENTS};
use crate::timestamp::{self, StoredDate, TimestampError};

use super::{decode_all, encode, report_fetch_failure, ServiceError};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct ClientDoc {
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default)]
    status: ClientStatus,
    #[serde(default)]
    project_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<StoredDate>,
}

impl ClientDoc {
    fn into_client(self, id: String) -> Result<Client, TimestampError> {
        Ok(Client {
            id,
            name: self.name,
            email: self.email,
            company: self.company,
            phone: self.phone,
            status: self.status,
            project_count: self.project_count,
            total_value: self.total_value,
            notes: self.notes,
            created_at: timestamp::or_now(self.created_at.as_ref(), Utc::now())?,
        })
    }
}

/// The editable part of a client, as filled in by the client dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInput {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub status: ClientStatus,
    pub notes: Option<String>,
}

impl ClientInput {
    fn into_doc(self, project_count: u32, total_value: Option<f64>) -> ClientDoc {
        ClientDoc {
            name: self.name,
            email: self.email,
            company: self.company,
            phone: self.phone.filter(|p| !p.is_empty()),
            status: self.status,
            project_count,
            total_value,
            notes: self.notes.filter(|n| !n.is_empty()),
            created_at: None,
        }
    }
}

impl From<&Client> for ClientInput {
    fn from(c: &Client) -> Self {
        ClientInput {
            name: c.name.clone(),
            email: c.email.clone(),
            company: c.company.clone(),
            phone: c.phone.clone(),
            status: c.status,
            notes: c.notes.clone(),
        }
    }
}

pub struct ClientService<'a> {
    store: &'a dyn DocumentStore,
    notifier: &'a dyn Notifier,
}

impl<'a> ClientService<'a> {
    pub fn new(store: &'a dyn DocumentStore, notifier: &'a dyn Notifier) -> Self {
        ClientService { store, notifier }
    }

    /// All clients, newest first; empty when the store cannot be read.
    pub fn list_clients(&self) -> Vec<Client> {
        match self.store.list(CLIENTS) {
            Ok(docs) => {
                let mut clients = decode_all(CLIENTS, docs, ClientDoc::into_client);
                clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                clients
            }
            Err(e) => {
                report_fetch_failure(self.notifier, "clients", &e);
                Vec::new()
            }
        }
    }

    /// New clients start with no projects and no value.
    pub fn create_client(&self, input: ClientInput) -> Result<String, ServiceError> {
        let mut doc = input.into_doc(0, Some(0.0));
        doc.created_at = Some(Utc::now().into());
        let id = self.store.insert(CLIENTS, encode(&doc)?).inspect_err(|e| {
            tracing::error!(error = %e, "Error creating client");
        })?;
        tracing::info!(%id, "Client created");
        Ok(id)
    }

    /// Saves dialog edits; the stored counters are carried over from `existing`.
    pub fn update_client(&self, existing: &Client, input: ClientInput) -> Result<(), ServiceError> {
        let doc = input.into_doc(existing.project_count, existing.total_value);
        let mut fields = encode(&doc)?;
        for optional in ["phone", "notes"] {
            fields.entry(optional).or_insert(serde_json::Value::Null);
        }
        self.store.update(CLIENTS, &existing.id, fields).inspect_err(|e| {
            tracing::error!(error = %e, "Error updating client");
        })?;
        Ok(())
    }

    /// Removes the client only; projects naming it are left untouched.
    pub fn delete_client(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(CLIENTS, id).inspect_err(|e| {
            tracing::error!(error = %e, "Error deleting client");
        })?;
        tracing::info!(id, "Client deleted");
        Ok(())
    }

    /// Adds the sample clients one by one.
    pub fn seed_clients(&self) -> Result<usize, ServiceError> {
        let samples = sample_clients();
        let count = samples.len();
        for (input, project_count, total_value) in samples {
            let mut doc = input.into_doc(project_count, Some(total_value));
            doc.created_at = Some(Utc::now().into());
            self.store.insert(CLIENTS, encode(&doc)?)?;
        }
        tracing::info!(count, "Clients seeded");
        Ok(count)
    }
}

fn sample_clients() -> Vec<(ClientInput, u32, f64)> {
    let client = |name: &str, email: &str, company: &str, phone: Option<&str>, status, notes: Option<&str>| {
        ClientInput {
            name: name.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            phone: phone.map(str::to_string),
            status,
            notes: notes.map(str::to_string),
        }
    };
    vec![
        (
            client(
                "Acme Corporation",
                "contact@acme.com",
                "Acme Corp",
                Some("+1 555-0100"),
                ClientStatus::Active,
                Some("Key enterprise client"),
            ),
            3,
            125_000.0,
        ),
        (
            client("TechStart Inc", "hello@techstart.io", "TechStart", Some("+1 555-0101"), ClientStatus::Active, None),
            2,
            45_000.0,
        ),
        (
            client(
                "Global Finance",
                "projects@globalfinance.com",
                "Global Finance Ltd",
                Some("+1 555-0102"),
                ClientStatus::Active,
                Some("Premium banking client"),
            ),
            5,
            280_000.0,
        ),
        (
            client("HealthPlus", "dev@healthplus.org", "HealthPlus Foundation", None, ClientStatus::Lead, None),
            0,
            0.0,
        ),
        (
            client(
                "RetailMax",
                "tech@retailmax.com",
                "RetailMax LLC",
                Some("+1 555-0104"),
                ClientStatus::Inactive,
                None,
            ),
            1,
            18_000.0,
        ),
    ]
}
