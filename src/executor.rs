use serde_json::Value;
use tracing::debug;

use crate::args::{CallArgs, Kwargs, strip_excluded};
use crate::call_stack::CallStack;
use crate::error::CrudError;
use crate::protocol::{CallContext, ContextManagerCallee};

impl CallStack {
    /// Runs every step in order and returns the last step's value.
    ///
    /// Keys starting with `_` are removed from `kwargs` first. Each step gets
    /// its selector id and, after the first step, the previous step's value.
    /// The first failing step ends execution; earlier steps are not undone.
    pub fn execute(
        &self,
        kwargs: &Kwargs,
        callee: Option<&dyn ContextManagerCallee>,
    ) -> Result<Value, CrudError> {
        let kwargs = strip_excluded(kwargs);
        let mut previous: Option<Value> = None;

        for (index, step) in self.steps().iter().enumerate() {
            let args = CallArgs::for_step(
                kwargs.clone(),
                step.select_id().map(str::to_string),
                previous.take(),
            );
            debug!(event = "CallStack", phase = "Execute", index = index, step = %step);

            let value = CallContext::run(callee, Some(step.method_name()), || step.invoke(args))?;
            previous = Some(value);
        }

        Ok(previous.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_stack::CallStep;
    use crate::protocol::{ExceptionDetails, Hooks};
    use crate::traits::Invocable;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recording(name: &'static str, log: Arc<Mutex<Vec<Value>>>) -> Invocable {
        Arc::new(move |args: CallArgs| {
            let seen = json!({
                "step": name,
                "kwargs": args.kwargs(),
                "select_id": args.select_id(),
                "selected": args.selected_value(),
            });
            log.lock().unwrap().push(seen);
            Ok(json!(format!("{name}-result")))
        })
    }

    fn failing() -> Invocable {
        Arc::new(|_args: CallArgs| Err(CrudError::nothing_matched()))
    }

    fn kwargs(value: Value) -> Kwargs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_threads_results_and_selector_ids() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CallStack::from_steps(
            "get",
            vec![
                CallStep::new(recording("select", log.clone()), "select", Some("42".into())),
                CallStep::new(recording("get_orders", log.clone()), "get_orders", Some("7".into())),
            ],
        );

        let result = stack
            .execute(&kwargs(json!({"limit": 5, "_token": "secret"})), None)
            .unwrap();
        assert_eq!(result, json!("get_orders-result"));

        insta::assert_json_snapshot!(*log.lock().unwrap(), @r#"
        [
          {
            "kwargs": {
              "limit": 5
            },
            "select_id": "42",
            "selected": null,
            "step": "select"
          },
          {
            "kwargs": {
              "limit": 5
            },
            "select_id": "7",
            "selected": "select-result",
            "step": "get_orders"
          }
        ]
        "#);
    }

    #[test]
    fn test_empty_stack_returns_null() {
        let stack = CallStack::from_steps("get", Vec::new());
        assert_eq!(stack.execute(&Kwargs::new(), None).unwrap(), Value::Null);
    }

    #[test]
    fn test_failure_stops_execution() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CallStack::from_steps(
            "get",
            vec![
                CallStep::new(failing(), "select", Some("1".into())),
                CallStep::new(recording("get", log.clone()), "get", None),
            ],
        );

        assert_eq!(
            stack.execute(&Kwargs::new(), None),
            Err(CrudError::nothing_matched())
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hooks_wrap_every_step() {
        fn hook(
            label: &'static str,
            seen: Arc<Mutex<Vec<String>>>,
        ) -> impl Fn(Option<&ExceptionDetails>) -> Result<(), CrudError> + Send + Sync + 'static
        {
            move |exception| {
                let failed = exception.map(|e| format!(":{}", e.kind())).unwrap_or_default();
                seen.lock().unwrap().push(format!("{label}{failed}"));
                Ok(())
            }
        }

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let hooks = Hooks::new()
            .on("pre_select", hook("pre_select", seen.clone()))
            .on("post_select", hook("post_select", seen.clone()))
            .on("pre_get", hook("pre_get", seen.clone()))
            .on("post_get", hook("post_get", seen.clone()));

        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CallStack::from_steps(
            "get",
            vec![
                CallStep::new(recording("select", log.clone()), "select", Some("1".into())),
                CallStep::new(failing(), "get", None),
            ],
        );

        assert!(stack.execute(&Kwargs::new(), Some(&hooks)).is_err());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["pre_select", "post_select", "pre_get", "post_get:NothingMatched"]
        );
    }
}
