use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anticipator::config::{SchedulerConfig, SchedulerMode};
use anticipator::warmup::{Layout, NamedResource};
use anticipator::{
    Activator, Anticipator, Constructors, ResourceId, Specialized, StaticInit, ViewType, Warmup,
    WarmupConfig,
};
use anticipator_test::{TestHost, TestView};

use crate::{TIMEOUT, setup_anticipator, wait_until};

const COLOR_ACCENT: ResourceId = ResourceId(0x01010433);
const TOOLBAR: ResourceId = ResourceId(0x7f0b0021);
const FLYOUT_CONTENT: ResourceId = ResourceId(0x7f0b0030);

static TABLES_BUILT: AtomicUsize = AtomicUsize::new(0);

fn build_tables() {
    TABLES_BUILT.fetch_add(1, Ordering::SeqCst);
}

struct Label;
struct Page;

fn test_host() -> TestHost {
    TestHost::new()
        .with_property("ro.build.version.sdk", "34")
        .with_attribute(COLOR_ACCENT, "colorAccent")
}

fn warmup_config() -> WarmupConfig {
    WarmupConfig {
        system_properties: vec!["ro.build.version.sdk".into()],
        attributes: vec![COLOR_ACCENT, ResourceId::NONE],
        named_resources: vec![NamedResource {
            name: "colorAccent".into(),
            kind: "attr".into(),
        }],
        layouts: vec![Layout {
            id: TOOLBAR,
            count: 2,
        }],
        ..Default::default()
    }
}

fn activator() -> Arc<dyn Activator<TestHost, TestView>> {
    let mut generic = Constructors::new();
    generic
        .register::<Label, _>(|_: &TestHost| TestView::new(ResourceId::NONE, "generic label"))
        .register::<Page, _>(|_: &TestHost| TestView::new(ResourceId::NONE, "generic page"));

    let mut shortcuts = Constructors::new();
    shortcuts.register::<Label, _>(|_: &TestHost| TestView::new(ResourceId::NONE, "fast label"));

    Arc::new(Specialized::new(shortcuts, Arc::new(generic)))
}

#[test]
fn test_register_then_retrieve() {
    let anticipator = setup_anticipator();
    let warmup = Warmup::new(&anticipator, test_host().into_ref());
    let config = warmup_config();

    let statics = [StaticInit::new("tables", build_tables)];
    assert_eq!(warmup.register(&config, &statics).unwrap(), 7);

    assert!(wait_until(TIMEOUT, || {
        anticipator.value_cache().len() == 5 && anticipator.allocation_heap().len() == 2
    }));
    assert_eq!(TABLES_BUILT.load(Ordering::SeqCst), 1);

    // registration order is preserved, and the zero attribute never reaches the host
    insta::assert_debug_snapshot!(warmup.host().calls(), @r###"
    [
        "system_property(ro.build.version.sdk)",
        "resolve_attribute(0x01010433)",
        "identifier(colorAccent, attr)",
        "resolve_attribute(0x01010433)",
        "inflate(0x7f0b0021)",
        "inflate(0x7f0b0021)",
    ]
    "###);
    let registered = warmup.host().calls().len();

    assert_eq!(
        warmup.system_property("ro.build.version.sdk").unwrap().as_deref(),
        Some("34")
    );
    assert!(warmup.ided_resource_exists(COLOR_ACCENT).unwrap());
    assert!(!warmup.ided_resource_exists(ResourceId::NONE).unwrap());
    assert!(warmup.named_resource_exists("colorAccent", "attr").unwrap());
    let first = warmup.inflate_resource(TOOLBAR).unwrap().unwrap();
    let second = warmup.inflate_resource(TOOLBAR).unwrap().unwrap();
    assert_eq!(first, second);

    // everything above was anticipated
    assert_eq!(warmup.host().calls().len(), registered);

    // the pool of toolbars is exhausted
    warmup.inflate_resource(TOOLBAR).unwrap();
    assert_eq!(warmup.host().calls().len(), registered + 1);

    assert_eq!(warmup.finish(), 5);
}

#[test]
fn test_anticipated_views() {
    let anticipator = setup_anticipator();
    let warmup = Warmup::new(&anticipator, test_host().into_ref());
    let activator = activator();

    warmup
        .anticipate_view(ViewType::of::<Label>(), Arc::clone(&activator), 2)
        .unwrap();
    warmup
        .anticipate_view(ViewType::of::<Page>(), Arc::clone(&activator), 1)
        .unwrap();
    assert!(wait_until(TIMEOUT, || anticipator.allocation_heap().len() == 3));

    let label = warmup
        .activate_view(ViewType::of::<Label>(), Arc::clone(&activator))
        .unwrap();
    assert_eq!(label.label, "fast label");
    let page = warmup
        .activate_view(ViewType::of::<Page>(), Arc::clone(&activator))
        .unwrap();
    assert_eq!(page.label, "generic page");

    // views are matched by host and type, not by activator
    let other: Arc<dyn Activator<TestHost, TestView>> = Arc::new(Constructors::new());
    assert!(warmup.activate_view(ViewType::of::<Label>(), other).is_ok());
    assert!(anticipator.allocation_heap().is_empty());

    assert!(
        warmup
            .activate_view(ViewType::of::<TestView>(), activator)
            .is_err()
    );
}

#[test]
fn test_hosts_do_not_share_results() {
    let anticipator = setup_anticipator();
    let main = Warmup::new(&anticipator, test_host().into_ref());
    let secondary = Warmup::new(&anticipator, test_host().into_ref());

    let config = WarmupConfig {
        system_properties: vec!["ro.build.version.sdk".into()],
        ..Default::default()
    };
    main.register(&config, &[]).unwrap();
    assert!(wait_until(TIMEOUT, || anticipator.value_cache().len() == 1));

    secondary.system_property("ro.build.version.sdk").unwrap();
    assert_eq!(secondary.host().calls().len(), 1);

    main.system_property("ro.build.version.sdk").unwrap();
    assert_eq!(main.host().calls().len(), 1);
}

#[test]
fn test_context_layouts_use_the_context_inflater() {
    let anticipator = setup_anticipator();
    let warmup = Warmup::new(&anticipator, test_host().into_ref());
    let config = WarmupConfig {
        layouts: vec![Layout {
            id: FLYOUT_CONTENT,
            count: 1,
        }],
        context_layouts: vec![Layout {
            id: FLYOUT_CONTENT,
            count: 1,
        }],
        ..Default::default()
    };

    assert_eq!(warmup.register(&config, &[]).unwrap(), 2);
    assert!(wait_until(TIMEOUT, || anticipator.allocation_heap().len() == 2));

    let view = warmup.inflate_context_resource(FLYOUT_CONTENT).unwrap().unwrap();
    assert_eq!(view.label, "inflated from context");
    let view = warmup.inflate_resource(FLYOUT_CONTENT).unwrap().unwrap();
    assert_eq!(view.label, "inflated");

    insta::assert_debug_snapshot!(warmup.host().calls(), @r###"
    [
        "inflate(0x7f0b0030)",
        "inflate_from_context(0x7f0b0030)",
    ]
    "###);
}

#[test]
fn test_inline_warmup() {
    anticipator_test::setup();
    let config = SchedulerConfig {
        mode: SchedulerMode::Inline,
        ..Default::default()
    };
    let anticipator = Anticipator::from_config(&config);
    let warmup = Warmup::new(&anticipator, test_host().into_ref());

    // everything is computed by the time registration returns
    warmup.register(&warmup_config(), &[]).unwrap();
    assert_eq!(anticipator.value_cache().len(), 4);
    assert_eq!(anticipator.allocation_heap().len(), 2);

    assert_eq!(warmup.finish(), 6);
}
