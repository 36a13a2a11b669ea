use crate::{read_json, send, UpstreamClient};
use datagate_core::{Error, Result, SnapshotSource, SnapshotStatus};

/// Dataset trigger/snapshot endpoints, bound to one caller's credential.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSource<'a> {
    client: &'a UpstreamClient,
    token: &'a str,
}

impl<'a> DatasetSource<'a> {
    pub fn new(client: &'a UpstreamClient, token: &'a str) -> Self {
        Self { client, token }
    }
}

fn snapshot_url(client: &UpstreamClient, snapshot_id: &str) -> Result<url::Url> {
    client.endpoint_with_segments(&["datasets", "v3", "snapshot", snapshot_id])
}

#[async_trait::async_trait]
impl SnapshotSource for DatasetSource<'_> {
    async fn trigger(&self, dataset_id: &str, inputs: &serde_json::Value) -> Result<String> {
        let rb = self
            .client
            .post(self.token, "/datasets/v3/trigger")
            .query(&[("dataset_id", dataset_id), ("include_errors", "true")])
            .json(&[inputs]);
        let v = read_json(send(rb).await?).await?;
        v.get("snapshot_id")
            .and_then(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::UpstreamProtocol(format!("no snapshot ID returned from trigger: {v}"))
            })
    }

    async fn snapshot(&self, snapshot_id: &str) -> Result<SnapshotStatus> {
        let url = snapshot_url(self.client, snapshot_id)?;
        let rb = self
            .client
            .get_url(self.token, url)
            .query(&[("format", "json")]);
        let v = read_json(send(rb).await?).await?;
        Ok(SnapshotStatus::classify(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_ids_are_encoded_as_one_path_segment() {
        let c = UpstreamClient::new("http://127.0.0.1:9/api/").unwrap();
        let u = snapshot_url(&c, "s_1").unwrap();
        assert_eq!(u.as_str(), "http://127.0.0.1:9/api/datasets/v3/snapshot/s_1");

        let u = snapshot_url(&c, "a b+c/d").unwrap();
        assert_eq!(u.path(), "/api/datasets/v3/snapshot/a%20b+c%2Fd");
    }
}
