// `rest/networkconf` endpoints
//
// The REST-style collection behind the controller's Networks settings
// page. Create and update usually echo the stored object in `data`; some
// firmware answers with an empty list, so the object is looked up again.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::legacy::client::LegacyClient;
use crate::legacy::models::LegacyNetworkConf;

impl LegacyClient {
    /// `GET /api/s/{site}/rest/networkconf`
    pub async fn list_networks(&self) -> Result<Vec<LegacyNetworkConf>, Error> {
        let url = self.networkconf_url(None)?;
        self.call(Method::GET, url, None).await
    }

    /// `POST /api/s/{site}/rest/networkconf`
    pub async fn create_network(
        &self,
        config: &LegacyNetworkConf,
    ) -> Result<LegacyNetworkConf, Error> {
        let url = self.networkconf_url(None)?;
        debug!(name = ?config.name, "creating network");
        let echoed = self.call(Method::POST, url, Some(config)).await?;

        let name = config.name.as_deref().unwrap_or_default();
        self.stored_or_lookup(echoed, |net| net.name.as_deref() == Some(name))
            .await?
            .ok_or_else(|| Error::LegacyApi {
                message: format!("network '{name}' was not returned after create"),
            })
    }

    /// `PUT /api/s/{site}/rest/networkconf/{id}`
    pub async fn update_network(
        &self,
        id: &str,
        config: &LegacyNetworkConf,
    ) -> Result<LegacyNetworkConf, Error> {
        let url = self.networkconf_url(Some(id))?;
        debug!(id, name = ?config.name, "updating network");
        let echoed = self.call(Method::PUT, url, Some(config)).await?;

        self.stored_or_lookup(echoed, |net| net.id.as_deref() == Some(id))
            .await?
            .ok_or_else(|| Error::LegacyApi {
                message: format!("network {id} was not returned after update"),
            })
    }

    /// `DELETE /api/s/{site}/rest/networkconf/{id}`
    pub async fn delete_network(&self, id: &str) -> Result<(), Error> {
        let url = self.networkconf_url(Some(id))?;
        debug!(id, "deleting network");
        let _: Vec<Value> = self.call(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// The echoed object, else the listed one `matches` picks.
    async fn stored_or_lookup(
        &self,
        echoed: Vec<LegacyNetworkConf>,
        matches: impl Fn(&LegacyNetworkConf) -> bool,
    ) -> Result<Option<LegacyNetworkConf>, Error> {
        if let Some(net) = echoed.into_iter().next() {
            return Ok(Some(net));
        }
        debug!("mutation returned no data, re-listing networks");
        Ok(self.list_networks().await?.into_iter().find(|net| matches(net)))
    }
}
