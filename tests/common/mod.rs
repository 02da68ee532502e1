use palaver_chat_lib::{
    AccessPolicy, ChatService, ConversationRecord, Identity, Role, UserRecord,
};
use tempfile::TempDir;

/// One fresh on-disk database per test. The tempdir must outlive the
/// service, so it rides along.
pub struct TestEnv {
    pub service: ChatService,
    _dir: TempDir,
}

pub fn env() -> TestEnv {
    env_with_policy(AccessPolicy::default())
}

pub fn env_with_policy(policy: AccessPolicy) -> TestEnv {
    let dir = TempDir::new().expect("failed to create test directory");
    let path = dir.path().join("chat_test.db");
    let service = ChatService::open_with_policy(path.to_str().unwrap(), policy)
        .expect("failed to open chat service");
    TestEnv {
        service,
        _dir: dir,
    }
}

/// Timestamps persist at millisecond precision; spacing writes out by a
/// few millis keeps creation order unambiguous in ordering assertions.
#[allow(dead_code)]
pub fn tick() {
    std::thread::sleep(std::time::Duration::from_millis(3));
}

pub fn register(service: &ChatService, username: &str) -> (UserRecord, Identity) {
    let user = service
        .register_user(username, Role::Guest)
        .expect("failed to register user");
    let identity = Identity::from(&user);
    (user, identity)
}

/// A two-person conversation between freshly registered users, the usual
/// starting point.
#[allow(dead_code)]
pub fn two_person_conversation(
    service: &ChatService,
) -> (Identity, Identity, ConversationRecord) {
    let (alice, alice_id) = register(service, "alice");
    let (_bob, bob_id) = register(service, "bob");
    let conversation = service
        .create_conversation(&alice_id, None, false, &[alice.user_id, bob_id.user_id])
        .expect("failed to create conversation");
    (alice_id, bob_id, conversation)
}
