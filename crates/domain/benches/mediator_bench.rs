use std::sync::Arc;

use common::{ActingPrincipal, EntityId, PrincipalId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::identity::client::GRANT_CLIENT_CREDENTIALS;
use domain::identity::{
    self, ClientSettings, ClientStore, CreateClientStoreCommand, IdentityRepositories,
    UpdateClientStoreCommand,
};
use domain::{Mediator, Repository, RequestContext};
use event_store::{EventStore, InMemoryEventStore};

fn settings(client_id: &str) -> ClientSettings {
    ClientSettings {
        client_id: client_id.to_string(),
        allowed_grant_types: vec![GRANT_CLIENT_CREDENTIALS.to_string()],
        require_client_secret: false,
        ..ClientSettings::default()
    }
}

fn wired(repositories: &IdentityRepositories) -> Mediator {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    identity::register(Mediator::builder(), repositories, store)
        .build()
        .unwrap()
}

fn bench_create_client(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = wired(&IdentityRepositories::in_memory());
    let principal = ActingPrincipal::new(PrincipalId::new(), "bench");

    c.bench_function("mediator/create_client", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut ctx = RequestContext::new(principal.clone());
                let command = CreateClientStoreCommand {
                    settings: settings(&EntityId::new().to_string()),
                };
                mediator.send(&mut ctx, command).await.unwrap();
            });
        });
    });
}

fn bench_update_client(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repositories = IdentityRepositories::in_memory();
    let mediator = wired(&repositories);
    let client = ClientStore {
        id: EntityId::new(),
        settings: settings("bench"),
    };
    rt.block_on(repositories.clients.insert(client.clone()))
        .unwrap();

    c.bench_function("mediator/update_client", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut ctx = RequestContext::new(ActingPrincipal::anonymous());
                let command = UpdateClientStoreCommand {
                    id: client.id,
                    settings: settings("bench"),
                };
                mediator.send(&mut ctx, command).await.unwrap();
            });
        });
    });
}

fn bench_rejected_command(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = wired(&IdentityRepositories::in_memory());

    c.bench_function("mediator/rejected_create", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut ctx = RequestContext::new(ActingPrincipal::anonymous());
                let command = CreateClientStoreCommand {
                    settings: ClientSettings::default(),
                };
                mediator.send(&mut ctx, command).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_client,
    bench_update_client,
    bench_rejected_command
);
criterion_main!(benches);
