use url::Url;

/// Addresses of the scoring backend's task resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEndpoints {
    base: Url,
}

impl RemoteEndpoints {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base)?;
        // Url::join drops the last segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(RemoteEndpoints { base })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn with_token(&self, resource: &str, token: &str) -> anyhow::Result<Url> {
        let mut url = self.base.join(resource)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    pub fn task_url(&self, token: &str) -> anyhow::Result<Url> { self.with_token("task/", token) }

    pub fn task_result_url(&self, token: &str) -> anyhow::Result<Url> { self.with_token("task_result/", token) }

    /// Download link for a finished task's node list, e.g. view "drugs", format "csv".
    pub fn download_url(&self, token: &str, view: &str, format: &str) -> anyhow::Result<Url> {
        let mut url = self.with_token("task_result/", token)?;
        url.query_pairs_mut().append_pair("view", view).append_pair("fmt", format);
        Ok(url)
    }
}
