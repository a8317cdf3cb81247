//! Data catalog - a database and a crawler that fills it

use declarative::intrinsic::{self, Pseudo};
use serde_json::{Map, Value, json};

use super::{Resource, types};

#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    pub description: String,
}

impl Resource for Database {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn resource_type(&self) -> &'static str {
        types::DATABASE
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("CatalogId".into(), intrinsic::pseudo(Pseudo::AccountId));
        props.insert(
            "DatabaseInput".into(),
            json!({ "Description": self.description, "Name": self.name }),
        );
        props
    }
}

/// Crawler over one prefix of a bucket
#[derive(Debug, Clone)]
pub struct Crawler {
    pub name: String,
    /// Logical ID of the role the crawler runs as
    pub role: String,
    /// Logical ID of the target database
    pub database: String,
    /// Logical ID of the crawled bucket
    pub bucket: String,
    pub prefix: String,
}

impl Crawler {
    /// `s3://<bucket>/<prefix>`
    pub fn target_path(&self) -> Value {
        intrinsic::join(
            "",
            vec![
                json!("s3://"),
                intrinsic::reference(&self.bucket),
                json!(format!("/{}", self.prefix)),
            ],
        )
    }
}

impl Resource for Crawler {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("Crawl {} into the catalog", intrinsic::render(&self.target_path()))
    }

    fn resource_type(&self) -> &'static str {
        types::CRAWLER
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("DatabaseName".into(), intrinsic::reference(&self.database));
        props.insert("Name".into(), json!(self.name));
        props.insert("Role".into(), intrinsic::get_att(&self.role, "Arn"));
        props.insert(
            "Targets".into(),
            json!({ "S3Targets": [{ "Path": self.target_path() }] }),
        );
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceExt;

    #[test]
    fn test_database_in_account_catalog() {
        let db = Database {
            name: "ticketmaster_db".into(),
            description: "Data catalog for ticketmaster data".into(),
        };
        let props = db.properties();
        assert_eq!(props["CatalogId"], json!({ "Ref": "AWS::AccountId" }));
        assert_eq!(props["DatabaseInput"]["Name"], json!("ticketmaster_db"));
        // pseudo parameters are not dependencies
        assert!(db.dependencies().is_empty());
    }

    #[test]
    fn test_crawler_targets_processed_prefix() {
        let crawler = Crawler {
            name: "ticketmaster_crawler".into(),
            role: "Role".into(),
            database: "Db".into(),
            bucket: "Data".into(),
            prefix: "Processed".into(),
        };
        let props = crawler.properties();
        assert_eq!(
            intrinsic::render(&props["Targets"]["S3Targets"][0]["Path"]),
            "s3://${Data}/Processed"
        );
        let deps = crawler.dependencies();
        for id in ["Role", "Db", "Data"] {
            assert!(deps.contains(&id.to_string()), "{id}");
        }
    }
}
