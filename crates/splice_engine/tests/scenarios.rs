//! End-to-end hot replacement against booted applications.

use splice_catalog::CatalogTable;
use splice_container::ObjectFactory;
use splice_core::LogicalName;
use splice_engine::{
    Application, HotPatchError, Resolution, RewireError, UnitOutcome, PATCHES_DIR, TYPES_DIR,
};
use splice_scope::{HttpVerb, MethodImage, StatementKind, Stereotype, TypeShape, UnitImage};
use std::path::Path;
use std::sync::Arc;

fn name(s: &str) -> LogicalName {
    LogicalName::parse(s).unwrap()
}

fn write_unit(root: &Path, image: &UnitImage) {
    let path = root.join(image.name.relative_path("unit"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, image.encode().unwrap()).unwrap();
}

fn handler(base_path: &str) -> Stereotype {
    Stereotype::Handler {
        base_path: base_path.to_string(),
    }
}

fn user_repo(result: &str) -> UnitImage {
    UnitImage::new(name("demo.repo.UserRepo"))
        .with_method(MethodImage::named("find").returning(result))
}

fn user_service_impl() -> UnitImage {
    UnitImage::new(name("demo.service.impl.UserServiceImpl"))
        .with_stereotype(Stereotype::Service)
        .extending(name("demo.service.UserService"))
        .with_injected("userRepo", name("demo.repo.UserRepo"))
        .with_method(MethodImage::named("find").delegating("userRepo", "find"))
}

fn user_controller() -> UnitImage {
    UnitImage::new(name("demo.web.UserController"))
        .with_stereotype(handler("/users"))
        .with_injected("userService", name("demo.service.UserService"))
        .with_method(
            MethodImage::named("find")
                .delegating("userService", "find")
                .routed(HttpVerb::Get, "/find"),
        )
}

/// Service layer: controller -> service contract -> repository
fn layered_app(dir: &Path) {
    let types = dir.join(TYPES_DIR);
    write_unit(&types, &user_repo("old-repo"));
    write_unit(
        &types,
        &UnitImage::new(name("demo.service.UserService"))
            .with_shape(TypeShape::Interface)
            .with_method(MethodImage::named("find")),
    );
    write_unit(&types, &user_service_impl());
    write_unit(&types, &user_controller());
}

#[test]
fn test_replacements_are_wired_to_each_other() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let app = Application::boot(dir.path()).unwrap();
    assert_eq!(app.dispatch(HttpVerb::Get, "/users/find").unwrap(), "old-repo");

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(&patches, &user_repo("new-repo"));
    write_unit(&patches, &user_service_impl());
    write_unit(&patches, &user_controller());

    let report = app.patch().unwrap();
    assert_eq!(report.replaced_count(), 3);
    assert_eq!(report.skipped().count(), 0);

    let repo = report.replacement(&name("demo.repo.UserRepo")).unwrap();
    let service = report.replacement(&name("demo.service.impl.UserServiceImpl")).unwrap();
    let old_repo = app.container().object("userRepo").unwrap();

    let wired = service.field("userRepo").unwrap();
    assert!(Arc::ptr_eq(&wired, repo));
    assert!(!Arc::ptr_eq(&wired, &old_repo));
    assert_eq!(service.invoke("find").unwrap(), "new-repo");

    let via_repo = report
        .rewired
        .iter()
        .find(|e| e.edge.field == "userRepo")
        .unwrap();
    assert_eq!(via_repo.via, Resolution::SameName);
    let via_service = report
        .rewired
        .iter()
        .find(|e| e.edge.field == "userService")
        .unwrap();
    assert_eq!(via_service.via, Resolution::Assignable);

    assert_eq!(app.dispatch(HttpVerb::Get, "/users/find").unwrap(), "new-repo");
}

#[test]
fn test_container_objects_are_left_in_place() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let app = Application::boot(dir.path()).unwrap();
    let before = app.container().object("userServiceImpl").unwrap();

    write_unit(&dir.path().join(PATCHES_DIR), &user_service_impl());
    let report = app.patch().unwrap();

    let after = app.container().object("userServiceImpl").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    let replacement = report.replacement(&name("demo.service.impl.UserServiceImpl")).unwrap();
    assert!(!Arc::ptr_eq(&before, replacement));
    assert_eq!(replacement.slot(), Some("userServiceImpl"));
    // The repository was not replaced, so the container's one stays wired.
    assert!(Arc::ptr_eq(
        &replacement.field("userRepo").unwrap(),
        &app.container().object("userRepo").unwrap()
    ));
}

fn base_mapper() -> UnitImage {
    UnitImage::new(name("demo.mapper.BaseMapper"))
        .with_shape(TypeShape::Interface)
        .with_method(MethodImage::named("count").mapped(StatementKind::Select, "select count(*)"))
}

fn user_mapper(get_sql: &str) -> UnitImage {
    UnitImage::new(name("demo.mapper.UserMapper"))
        .with_shape(TypeShape::Interface)
        .with_stereotype(Stereotype::Repository)
        .extending(name("demo.mapper.BaseMapper"))
        .with_method(MethodImage::named("getUser").mapped(StatementKind::Select, get_sql))
        .with_method(
            MethodImage::named("insertUser").mapped(StatementKind::Insert, "insert into users"),
        )
        .with_method(
            MethodImage::named("deleteUser").mapped(StatementKind::Delete, "delete from users"),
        )
}

#[test]
fn test_mapper_surgery_keeps_inherited_statements() {
    let dir = tempfile::tempdir().unwrap();
    let types = dir.path().join(TYPES_DIR);
    write_unit(&types, &base_mapper());
    write_unit(&types, &user_mapper("select * from users where id = 1"));
    let app = Application::boot(dir.path()).unwrap();

    let statements = app.catalog().read().keys(CatalogTable::Statements);
    assert_eq!(statements.len(), 4);
    let count_before = app
        .catalog()
        .read()
        .statement("demo.mapper.UserMapper.count")
        .unwrap();

    let mapper = app.container().object("userMapper").unwrap();
    assert_eq!(
        mapper.invoke("getUser").unwrap(),
        "select: select * from users where id = 1"
    );

    write_unit(
        &dir.path().join(PATCHES_DIR),
        &user_mapper("select * from users where id = 2"),
    );
    let report = app.patch().unwrap();
    assert_eq!(
        report.outcome(&name("demo.mapper.UserMapper")),
        Some(&UnitOutcome::Handled)
    );
    assert_eq!(report.replaced_count(), 0);

    let catalog = app.catalog().read();
    assert_eq!(catalog.keys(CatalogTable::Statements).len(), 4);
    let count_after = catalog.statement("demo.mapper.UserMapper.count").unwrap();
    assert!(Arc::ptr_eq(&count_before, &count_after));
    assert_eq!(
        catalog.statement("demo.mapper.UserMapper.getUser").unwrap().sql,
        "select * from users where id = 2"
    );
    drop(catalog);

    // The same proxy object now answers with the new statement.
    assert_eq!(
        mapper.invoke("getUser").unwrap(),
        "select: select * from users where id = 2"
    );
    assert_eq!(mapper.invoke("count").unwrap(), "select: select count(*)");
}

fn hello_controller(greeting: &str) -> UnitImage {
    UnitImage::new(name("demo.web.HelloController"))
        .with_stereotype(handler("/hello"))
        .with_method(
            MethodImage::named("hello")
                .returning(greeting)
                .routed(HttpVerb::Get, "/"),
        )
}

#[test]
fn test_routes_move_to_replacement_handler() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(&dir.path().join(TYPES_DIR), &hello_controller("v1"));
    let app = Application::boot(dir.path()).unwrap();
    assert_eq!(app.dispatch(HttpVerb::Get, "/hello").unwrap(), "v1");

    write_unit(
        &dir.path().join(PATCHES_DIR),
        &hello_controller("v2").with_method(
            MethodImage::named("added")
                .returning("added")
                .routed(HttpVerb::Post, "/added"),
        ),
    );
    let report = app.patch().unwrap();

    let replacement = report.replacement(&name("demo.web.HelloController")).unwrap();
    let bound = app
        .endpoints()
        .lookup(&splice_endpoint::RouteDescriptor::new(HttpVerb::Get, "/hello"))
        .unwrap();
    assert!(Arc::ptr_eq(&bound.object, replacement));
    assert_eq!(app.dispatch(HttpVerb::Get, "/hello").unwrap(), "v2");
    assert_eq!(app.dispatch(HttpVerb::Post, "/hello/added").unwrap(), "added");
    assert_eq!(app.endpoints().len(), 2);
}

#[test]
fn test_scheduled_dependency_without_object_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let app = Application::boot(dir.path()).unwrap();

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(
        &patches,
        &UnitImage::new(name("demo.repo.UserRepo")).with_shape(TypeShape::Abstract),
    );
    write_unit(&patches, &user_service_impl());

    let err = app.patch().unwrap_err();
    match &err {
        HotPatchError::Rewire(RewireError::MissingDependency { owner, dependency }) => {
            assert_eq!(owner, &name("demo.service.impl.UserServiceImpl"));
            assert_eq!(dependency, &name("demo.repo.UserRepo"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("demo.service.impl.UserServiceImpl"));
    assert!(message.contains("demo.repo.UserRepo"));
}

#[test]
fn test_broken_unit_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(&dir.path().join(TYPES_DIR), &hello_controller("v1"));
    let app = Application::boot(dir.path()).unwrap();

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(&patches, &hello_controller("v2"));
    std::fs::create_dir_all(patches.join("demo")).unwrap();
    std::fs::write(patches.join("demo").join("Broken.unit"), b"not an image").unwrap();

    let report = app.patch().unwrap();
    assert!(matches!(
        report.outcome(&name("demo.Broken")),
        Some(UnitOutcome::Skipped { .. })
    ));
    assert_eq!(app.dispatch(HttpVerb::Get, "/hello").unwrap(), "v2");
}

#[test]
fn test_new_handler_joins_the_application() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let app = Application::boot(dir.path()).unwrap();

    write_unit(
        &dir.path().join(PATCHES_DIR),
        &UnitImage::new(name("demo.web.AuditController"))
            .with_stereotype(handler("/audit"))
            .with_injected("userService", name("demo.service.UserService"))
            .with_method(
                MethodImage::named("latest")
                    .delegating("userService", "find")
                    .routed(HttpVerb::Get, "/latest"),
            ),
    );

    let report = app.patch().unwrap();
    let controller = report.replacement(&name("demo.web.AuditController")).unwrap();
    assert_eq!(controller.slot(), None);
    assert!(app.space().contains(&name("demo.web.AuditController")));
    assert_eq!(app.dispatch(HttpVerb::Get, "/audit/latest").unwrap(), "old-repo");
    assert_eq!(app.endpoints().len(), 2);
}

#[test]
fn test_new_dependency_is_wired_from_the_run() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let app = Application::boot(dir.path()).unwrap();

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(
        &patches,
        &UnitImage::new(name("demo.repo.AuditRepo"))
            .with_method(MethodImage::named("latest").returning("audit-entry")),
    );
    write_unit(
        &patches,
        &user_service_impl()
            .with_injected("auditRepo", name("demo.repo.AuditRepo"))
            .with_method(MethodImage::named("audit").delegating("auditRepo", "latest")),
    );

    let report = app.patch().unwrap();
    assert_eq!(report.skipped().count(), 0);
    assert_eq!(report.replaced_count(), 2);

    let audit = report.replacement(&name("demo.repo.AuditRepo")).unwrap();
    let service = report.replacement(&name("demo.service.impl.UserServiceImpl")).unwrap();
    assert!(Arc::ptr_eq(&service.field("auditRepo").unwrap(), audit));
    assert_eq!(service.invoke("audit").unwrap(), "audit-entry");
    assert!(Arc::ptr_eq(
        &service.field("userRepo").unwrap(),
        &app.container().object("userRepo").unwrap()
    ));

    let edge = report
        .rewired
        .iter()
        .find(|e| e.edge.field == "auditRepo")
        .unwrap();
    assert_eq!(edge.via, Resolution::Assignable);
}

#[test]
fn test_unfilled_dependency_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    let types = dir.path().join(TYPES_DIR);
    write_unit(
        &types,
        &UnitImage::new(name("demo.repo.AuditRepo")).with_shape(TypeShape::Interface),
    );
    let app = Application::boot(dir.path()).unwrap();

    write_unit(
        &dir.path().join(PATCHES_DIR),
        &user_service_impl().with_injected("auditRepo", name("demo.repo.AuditRepo")),
    );

    match app.patch().unwrap_err() {
        HotPatchError::Rewire(RewireError::UnresolvedDependency { owner, field, ty }) => {
            assert_eq!(owner, name("demo.service.impl.UserServiceImpl"));
            assert_eq!(field, "auditRepo");
            assert_eq!(ty, name("demo.repo.AuditRepo"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_skip_reason_names_the_failing_field() {
    let dir = tempfile::tempdir().unwrap();
    layered_app(dir.path());
    write_unit(
        &dir.path().join(TYPES_DIR),
        &UnitImage::new(name("demo.repo.CachedUserRepo"))
            .extending(name("demo.repo.UserRepo"))
            .with_method(MethodImage::named("find").returning("cached")),
    );
    let app = Application::boot(dir.path()).unwrap();

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(
        &patches,
        &UnitImage::new(name("demo.service.impl.ReportServiceImpl"))
            .with_injected("repo", name("demo.repo.UserRepo")),
    );
    write_unit(&patches, &user_repo("new-repo"));

    let report = app.patch().unwrap();
    let reason = match report.outcome(&name("demo.service.impl.ReportServiceImpl")) {
        Some(UnitOutcome::Skipped { reason }) => reason.clone(),
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert!(reason.contains("demo.service.impl.ReportServiceImpl.repo matches several objects"));
    assert!(reason.contains("cachedUserRepo"));
    assert!(matches!(
        report.outcome(&name("demo.repo.UserRepo")),
        Some(UnitOutcome::Replaced { .. })
    ));
}

#[test]
fn test_skip_reason_names_the_failing_mapper() {
    let dir = tempfile::tempdir().unwrap();
    let types = dir.path().join(TYPES_DIR);
    write_unit(&types, &base_mapper());
    write_unit(&types, &user_mapper("select 1"));
    let app = Application::boot(dir.path()).unwrap();

    let patches = dir.path().join(PATCHES_DIR);
    write_unit(&patches, &user_mapper("select 2"));
    std::fs::write(
        patches.join("demo/mapper/UserMapper.mapper.json"),
        r#"{"namespace": "demo.mapper.OrderMapper"}"#,
    )
    .unwrap();

    let report = app.patch().unwrap();
    let reason = match report.outcome(&name("demo.mapper.UserMapper")) {
        Some(UnitOutcome::Skipped { reason }) => reason.clone(),
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert!(reason.contains("catalog surgery on demo.mapper.UserMapper failed"));
    assert!(reason.contains("demo.mapper.OrderMapper"));
    assert_eq!(
        app.catalog().read().statement("demo.mapper.UserMapper.getUser").unwrap().sql,
        "select 1"
    );
}

#[test]
fn test_report_serializes() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(&dir.path().join(TYPES_DIR), &hello_controller("v1"));
    let app = Application::boot(dir.path()).unwrap();
    write_unit(&dir.path().join(PATCHES_DIR), &hello_controller("v2"));

    let report = app.patch().unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["enabled"], true);
    assert_eq!(json["units"][0]["name"], "demo.web.HelloController");
    assert_eq!(json["units"][0]["category"], "endpoint_handler");
    assert_eq!(json["units"][0]["outcome"], "replaced");
}

#[test]
fn test_layered_demo() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/layered");
    let app = Application::boot(&dir).unwrap();
    assert_eq!(app.dispatch(HttpVerb::Get, "/users/find").unwrap(), "alice (v1)");
    assert_eq!(
        app.dispatch(HttpVerb::Get, "/users/load").unwrap(),
        "select: select user_id, user_name from users"
    );
    assert!(app.dispatch(HttpVerb::Get, "/users/version").is_err());

    let report = app.patch().unwrap();
    assert_eq!(report.skipped().count(), 0);
    assert_eq!(
        report.outcome(&name("demo.mapper.UserMapper")),
        Some(&UnitOutcome::Handled)
    );

    assert_eq!(app.dispatch(HttpVerb::Get, "/users/find").unwrap(), "alice (v2)");
    assert_eq!(
        app.dispatch(HttpVerb::Get, "/users/load").unwrap(),
        "select: select user_id, user_name, user_email from users"
    );
    assert_eq!(app.dispatch(HttpVerb::Get, "/users/version").unwrap(), "v2");

    let catalog = app.catalog().read();
    assert!(catalog.contains(
        CatalogTable::KeyGenerators,
        "demo.mapper.UserMapper.insertUser!selectKey"
    ));
    assert!(catalog.contains(CatalogTable::ResultMaps, "demo.mapper.UserMapper.userMap"));
    assert!(catalog
        .statement("demo.mapper.UserMapper.insertUser")
        .unwrap()
        .sql
        .contains("email"));
}
