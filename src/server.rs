use crate::pipeline::DepthPipeline;
use crate::protocol::{boxes_from_wire, Request, Response};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What the loop does after handling a line
#[derive(Debug, PartialEq)]
pub enum Control {
    Respond(Response),
    Exit,
}

/// Persistent request loop
///
/// Reads one JSON command per line and writes one JSON response per line,
/// strictly in order. Nothing a request contains can stop the loop; only
/// end of input, an `exit` command, or a broken output stream do.
pub struct Server {
    pipeline: DepthPipeline,
    handled: u64,
    failed: u64,
}

impl Server {
    pub fn new(pipeline: DepthPipeline) -> Self {
        Self {
            pipeline,
            handled: 0,
            failed: 0,
        }
    }

    pub fn run<R, W>(&mut self, mut input: R, mut output: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        tracing::info!("Depth service ready. Waiting for requests...");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .context("Failed to read request")?;
            if read == 0 {
                tracing::info!("Input closed");
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            match self.handle_line(&line) {
                Control::Respond(response) => {
                    serde_json::to_writer(&mut output, &response).context("Failed to encode response")?;
                    output.write_all(b"\n").context("Failed to write response")?;
                    output.flush().context("Failed to flush response")?;
                }
                Control::Exit => {
                    tracing::info!("Exit requested");
                    break;
                }
            }
        }

        tracing::info!(
            "Depth service stopping: {} requests, {} failed",
            self.handled,
            self.failed
        );
        Ok(())
    }

    /// Turn one input line into a response (or an exit)
    pub fn handle_line(&mut self, line: &str) -> Control {
        self.handled += 1;

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => return self.fail(e.to_string()),
        };

        match request {
            Request::Ping => Control::Respond(Response::Ok),
            Request::Exit => Control::Exit,
            Request::Process {
                image_path,
                bounding_boxes,
            } => {
                let boxes = boxes_from_wire(bounding_boxes.as_deref().unwrap_or_default());
                let pipeline = &mut self.pipeline;

                match catch_unwind(AssertUnwindSafe(|| pipeline.process(&image_path, &boxes))) {
                    Ok(Ok(report)) => Control::Respond(Response::Success(report)),
                    Ok(Err(e)) => self.fail(format!("{:#}", e)),
                    Err(_) => self.fail(format!("Processing {} panicked", image_path.display())),
                }
            }
        }
    }

    fn fail(&mut self, error: String) -> Control {
        self.failed += 1;
        tracing::warn!("Request failed: {}", error);
        Control::Respond(Response::error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{
        estimate_focal_length, inverse_depth_scale, DepthOutput, ResampleMethod, Resampler, EPSILON,
    };
    use crate::model::{DepthModel, Prediction};
    use crate::pipeline::testing::{ConstantModel, SyntheticSource};
    use image::RgbImage;
    use serde_json::Value;
    use std::io::Cursor;

    fn server(model: impl DepthModel + 'static) -> Server {
        Server::new(DepthPipeline::new(
            Box::new(model),
            Box::new(SyntheticSource {
                width: 640,
                height: 480,
            }),
            Resampler::new(ResampleMethod::Bilinear),
        ))
    }

    fn run(server: &mut Server, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.run(Cursor::new(input.as_bytes()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn ping_replies_ok() {
        let mut server = server(ConstantModel::inverse(&[480, 640], 0.5));
        let responses = run(&mut server, "{\"command\":\"ping\"}\n");
        assert_eq!(responses, vec![serde_json::json!({"status": "ok"})]);
    }

    #[test]
    fn survives_bad_requests() {
        let mut server = server(ConstantModel::inverse(&[480, 640], 0.5));
        let input = [
            "this is not json",
            r#"{"command":"teleport"}"#,
            r#"{"command":"process","image_path":"/tmp/missing.jpg"}"#,
            r#"{"command":"ping"}"#,
        ]
        .join("\n");

        let responses = run(&mut server, &input);
        assert_eq!(responses.len(), 4);
        for response in &responses[..3] {
            assert_eq!(response["status"], "error");
            assert!(response["error"].as_str().is_some_and(|e| !e.is_empty()));
        }
        assert_eq!(responses[3]["status"], "ok");
    }

    #[test]
    fn process_uniform_surface() {
        let mut server = server(ConstantModel::inverse(&[1, 480, 640], 0.5));
        let input = "{\"command\":\"process\",\"image_path\":\"img.jpg\",\"bounding_boxes\":[[10,10,50,50]]}\n";

        let responses = run(&mut server, input);
        assert_eq!(responses.len(), 1);
        let response = &responses[0];

        let expected = inverse_depth_scale(640, 480) / (0.5 + EPSILON as f64);
        assert_eq!(response["status"], "success");
        assert_eq!(response["depth_map_shape"], serde_json::json!([480, 640]));
        let focal = response["focal_length_px"].as_f64().unwrap();
        assert!((focal - estimate_focal_length(640, 480)).abs() < 1e-9);

        let object = &response["objects"][0];
        assert_eq!(object["bbox"], serde_json::json!([10, 10, 50, 50]));
        let median = object["depth_meters"].as_f64().unwrap();
        assert!((median - expected).abs() < 1e-5);
        assert_eq!(object["depth_min_meters"].as_f64().unwrap(), median);
        assert_eq!(object["depth_mean_meters"].as_f64().unwrap(), median);
    }

    #[test]
    fn nan_model_focal_is_reported_as_number() {
        let mut server = server(ConstantModel {
            shape: vec![1, 1, 32, 32],
            value: 1.5,
            output: crate::depth::DepthOutput::Metric,
            focal_length_px: Some(f32::NAN),
        });
        let responses = run(&mut server, "{\"command\":\"process\",\"image_path\":\"img.jpg\"}\n");

        assert_eq!(responses[0]["status"], "success");
        let focal = responses[0]["focal_length_px"].as_f64().unwrap();
        assert!((focal - estimate_focal_length(640, 480)).abs() < 1e-9);
    }

    #[test]
    fn empty_image_is_an_error_response() {
        let mut server = Server::new(DepthPipeline::new(
            Box::new(ConstantModel::inverse(&[32, 32], 0.5)),
            Box::new(SyntheticSource { width: 0, height: 0 }),
            Resampler::new(ResampleMethod::Bilinear),
        ));
        let input = "{\"command\":\"process\",\"image_path\":\"img.jpg\",\"bounding_boxes\":[[0,0,4,4]]}\n{\"command\":\"ping\"}\n";

        let responses = run(&mut server, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["status"], "error");
        assert_eq!(responses[1]["status"], "ok");
    }

    #[test]
    fn exit_stops_without_reply() {
        let mut server = server(ConstantModel::inverse(&[480, 640], 0.5));
        let input = "{\"command\":\"exit\"}\n{\"command\":\"ping\"}\n";
        assert!(run(&mut server, input).is_empty());
    }

    #[test]
    fn end_of_input_stops() {
        let mut server = server(ConstantModel::inverse(&[480, 640], 0.5));
        assert!(run(&mut server, "").is_empty());
        // Final line without a trailing newline is still served
        assert_eq!(run(&mut server, r#"{"command":"ping"}"#).len(), 1);
    }

    #[test]
    fn invalid_utf8_is_a_request_error() {
        let mut server = server(ConstantModel::inverse(&[480, 640], 0.5));
        let mut output = Vec::new();
        server
            .run(Cursor::new(b"\xff\xfe\n{\"command\":\"ping\"}\n".to_vec()), &mut output)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"error\""));
        assert_eq!(lines[1], r#"{"status":"ok"}"#);
    }

    struct PanickingModel;

    impl DepthModel for PanickingModel {
        fn predict(&mut self, _image: &RgbImage) -> anyhow::Result<Prediction> {
            panic!("runtime bug")
        }

        fn output_kind(&self) -> DepthOutput {
            DepthOutput::NormalizedInverse
        }

        fn input_size(&self) -> (u32, u32) {
            (1536, 1536)
        }
    }

    #[test]
    fn panics_become_error_responses() {
        let mut server = server(PanickingModel);
        let input = "{\"command\":\"process\",\"image_path\":\"img.jpg\"}\n{\"command\":\"ping\"}\n";

        let responses = run(&mut server, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["status"], "error");
        assert_eq!(responses[1]["status"], "ok");
    }
}
