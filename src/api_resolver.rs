use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Config, Resource};

/// Hands out typed [`Api`]s sharing one client built from an explicit [`Config`].
#[derive(Clone)]
pub struct ApiResolver {
    pub client: Client,
}

impl ApiResolver {
    pub fn try_new(config: Config) -> kube::Result<Self> {
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    pub fn all<K>(&self) -> Api<K>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    pub fn namespaced<K>(&self, ns: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), ns)
    }
}
