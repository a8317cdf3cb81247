//! Batch job resource

use declarative::intrinsic;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::{Resource, types};
use crate::schema::JobConfig;

/// A python shell job reading its script from the scripts bucket
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub description: String,
    pub command: String,
    pub python_version: String,
    pub glue_version: String,
    pub max_capacity: f64,
    pub timeout: u32,
    /// Logical ID of the execution role
    pub role: String,
    /// Logical ID of the bucket holding the script
    pub scripts_bucket: String,
    pub script_key: String,
    /// Argument name and logical ID of the bucket it receives
    pub bucket_argument: (String, String),
    pub arguments: BTreeMap<String, String>,
    /// Grants the job needs in place before it can run
    pub after: Vec<String>,
}

impl Job {
    pub fn from_config(
        config: &JobConfig,
        role: &str,
        scripts_bucket: &str,
        script_key: String,
        data_bucket: &str,
    ) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            command: config.command.clone(),
            python_version: config.python_version.clone(),
            glue_version: config.glue_version.clone(),
            max_capacity: config.max_capacity,
            timeout: config.timeout,
            role: role.to_string(),
            scripts_bucket: scripts_bucket.to_string(),
            script_key,
            bucket_argument: (config.bucket_argument.clone(), data_bucket.to_string()),
            arguments: config.literal_arguments(),
            after: Vec::new(),
        }
    }

    /// `s3://<scripts bucket>/<key>`
    pub fn script_location(&self) -> Value {
        intrinsic::join(
            "",
            vec![
                json!("s3://"),
                intrinsic::reference(&self.scripts_bucket),
                json!(format!("/{}", self.script_key)),
            ],
        )
    }

    fn default_arguments(&self) -> Value {
        let mut args: Map<String, Value> = self
            .arguments
            .iter()
            .map(|(key, value)| (key.clone(), json!(value)))
            .collect();
        // the bucket is always wired by reference
        let (name, bucket) = &self.bucket_argument;
        args.insert(name.clone(), intrinsic::reference(bucket));
        Value::Object(args)
    }
}

impl Resource for Job {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        if self.description.is_empty() {
            format!("Job running {}", self.script_key)
        } else {
            self.description.clone()
        }
    }

    fn resource_type(&self) -> &'static str {
        types::JOB
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(
            "Command".into(),
            json!({
                "Name": self.command,
                "PythonVersion": self.python_version,
                "ScriptLocation": self.script_location(),
            }),
        );
        props.insert("DefaultArguments".into(), self.default_arguments());
        if !self.description.is_empty() {
            props.insert("Description".into(), json!(self.description));
        }
        props.insert("GlueVersion".into(), json!(self.glue_version));
        props.insert("MaxCapacity".into(), json!(self.max_capacity));
        props.insert("Name".into(), json!(self.name));
        props.insert("Role".into(), intrinsic::get_att(&self.role, "Arn"));
        props.insert("Timeout".into(), json!(self.timeout));
        props
    }

    fn depends_on(&self) -> Vec<String> {
        self.after.clone()
    }
}

/// Split a script location back into (bucket logical ID, key)
pub fn parse_script_location(value: &Value) -> Option<(&str, &str)> {
    let args = value.get("Fn::Join")?.as_array()?;
    let parts = args.get(1)?.as_array()?;
    match parts.as_slice() {
        [scheme, bucket, key] if scheme.as_str() == Some("s3://") => {
            let bucket = intrinsic::as_reference(bucket)?;
            let key = key.as_str()?.strip_prefix('/')?;
            Some((bucket, key))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StackConfig;

    fn analysis_job() -> Job {
        let config = StackConfig::default();
        Job::from_config(
            &config.jobs[2],
            "Role",
            "Scripts",
            "assets/V2TicketMasterAnalysis_Final.py".into(),
            "Data",
        )
    }

    #[test]
    fn test_job_properties() {
        let props = analysis_job().properties();
        assert_eq!(props["Name"], json!("parquet_analysis_job"));
        assert_eq!(props["Command"]["Name"], json!("pythonshell"));
        assert_eq!(props["Command"]["PythonVersion"], json!("3.9"));
        assert_eq!(props["GlueVersion"], json!("3.0"));
        assert_eq!(props["MaxCapacity"], json!(1.0));
        assert_eq!(props["Timeout"], json!(3));
        assert_eq!(props["Role"], intrinsic::get_att("Role", "Arn"));
        assert_eq!(props["DefaultArguments"]["--my_bucket"], intrinsic::reference("Data"));
        assert_eq!(
            props["DefaultArguments"]["--additional-python-modules"],
            json!("dython==0.7.5,matplotlib==3.8.3,folium==0.16.0")
        );
    }

    #[test]
    fn test_bucket_argument_stays_a_reference() {
        let mut job = analysis_job();
        job.arguments
            .insert("--my_bucket".into(), "some-hardcoded-bucket".into());
        let props = job.properties();
        assert_eq!(props["DefaultArguments"]["--my_bucket"], intrinsic::reference("Data"));
    }

    #[test]
    fn test_script_location_round_trips() {
        let job = analysis_job();
        let location = job.script_location();
        assert_eq!(
            intrinsic::render(&location),
            "s3://${Scripts}/assets/V2TicketMasterAnalysis_Final.py"
        );
        assert_eq!(
            parse_script_location(&location),
            Some(("Scripts", "assets/V2TicketMasterAnalysis_Final.py"))
        );
        assert_eq!(parse_script_location(&json!("s3://literal/key.py")), None);
    }
}
