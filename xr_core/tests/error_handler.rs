mod common;

use std::sync::Mutex;

use common::{create_info, platform_binding, started_context, FakeLoader, FakeRuntime};
use openxr::sys as xr;
use xr_core::runtime::RuntimeEvent;
use xr_core::Context;

struct Reported {
    message: String,
    result: Option<xr::Result>,
    result_string: Option<String>,
}

static REPORTED: Mutex<Vec<Reported>> = Mutex::new(Vec::new());

// The handler is process wide, so everything it should see happens in this one test.
#[test]
fn handler_receives_every_reported_error() {
    assert!(xr_core::set_error_handler(|info| {
        REPORTED.lock().unwrap().push(Reported {
            message: info.user_message.to_owned(),
            result: info.result,
            result_string: info.result_string.map(str::to_owned),
        });
    }));
    assert!(!xr_core::set_error_handler(|_| {}));

    let runtime = FakeRuntime::new();
    runtime.state().fail_instance = true;
    let loader = FakeLoader::new(runtime.clone(), &[platform_binding().extension_name()]);
    assert!(Context::new(&loader, create_info()).is_err());

    let runtime = FakeRuntime::new();
    let mut context = started_context(&runtime, &[]);
    runtime
        .state()
        .events
        .push_back(RuntimeEvent::InstanceLossPending);
    assert!(context.poll_events().is_err());

    let reported = REPORTED.lock().unwrap();
    assert_eq!(reported.len(), 2);

    assert_eq!(reported[0].message, "Failed to connect to an OpenXR runtime.");
    assert_eq!(reported[0].result, Some(xr::Result::ERROR_RUNTIME_FAILURE));
    assert!(reported[0].result_string.is_some());

    assert_eq!(reported[1].result, Some(xr::Result::ERROR_INSTANCE_LOST));
    assert_eq!(
        reported[1].result_string.as_deref(),
        Some(format!("{:?}", xr::Result::ERROR_INSTANCE_LOST).as_str())
    );
}
