use rmcp::ServiceExt;
use rmcp::transport::TokioChildProcess;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

fn call(name: &'static str, args: serde_json::Value) -> rmcp::model::CallToolRequestParams {
    let mut params = rmcp::model::CallToolRequestParams::new(name);
    params.arguments = args.as_object().cloned();
    params
}

#[tokio::test]
async fn e2e_stdio_logs_water_into_json_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_path = dir.path().join("fittrack.json");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fittrack_mcp"));
    cmd.env("FITTRACK_DATA_PATH", &data_path);
    cmd.env("FITTRACK_LOG_LEVEL", "debug");
    cmd.env_remove("GEMINI_API_KEY");

    let (child, mut stderr_opt) = TokioChildProcess::builder(cmd)
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn child");
    let service = match ().serve(child).await {
        Ok(s) => s,
        Err(e) => {
            if let Some(ref mut stderr) = stderr_opt {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                eprintln!("child stderr:\n{}", buf);
            }
            panic!("serve failed: {e}");
        }
    };

    let tools = service
        .list_tools(Default::default())
        .await
        .expect("list tools");
    let names: Vec<_> = tools.tools.into_iter().map(|t| t.name.to_string()).collect();
    assert!(names.iter().any(|n| n == "log_water"));
    assert!(names.iter().any(|n| n == "get_streak_stats"));

    let res = service
        .call_tool(call(
            "log_water",
            serde_json::json!({ "date": "2026-04-01", "liters": 4.0 }),
        ))
        .await
        .expect("call log_water");
    let day = res.structured_content.expect("structured result");
    assert_eq!(day.get("water_liters").and_then(|v| v.as_f64()), Some(4.0));
    assert_eq!(day.get("goals_completed").and_then(|v| v.as_u64()), Some(1));

    let res = service
        .call_tool(call("get_today", serde_json::json!({ "date": "2026-04-01" })))
        .await
        .expect("call get_today");
    let day = res.structured_content.expect("structured result");
    assert_eq!(day.get("water_liters").and_then(|v| v.as_f64()), Some(4.0));

    service.cancel().await.expect("cancel");

    let saved = tokio::fs::read_to_string(&data_path)
        .await
        .expect("store file written");
    assert!(saved.contains("2026-04-01"));
}
