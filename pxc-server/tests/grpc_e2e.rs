use async_trait::async_trait;
use pxc::{
    CloudEnv, CloudInventory, CloudResolver, ClusterVars, EnvResolver, HostDiscovery,
    KubeconfigSource, PveHost, PxcError,
};
use pxc_proto::{
    CloudServiceClient, GetKubeconfigRequest, GetPveInventoryRequest, HealthCheckRequest,
    HealthClient, ServingStatus,
};
use pxc_server::grpc_server::serve_tcp;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const KUBECONFIG: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<&'static str>>,
}

struct Discovery(Arc<Recorder>);

#[async_trait]
impl HostDiscovery for Discovery {
    async fn online_host(&self, target_pve: &str) -> pxc::Result<PveHost> {
        self.0.calls.lock().unwrap().push("discovery");
        if target_pve != "pve-a.example.com" {
            return Err(PxcError::UnknownTarget {
                cluster: target_pve.to_string(),
                cloud_domain: String::new(),
            });
        }
        Ok(PveHost {
            name: "pve1".to_string(),
            address: "10.0.0.11".to_string(),
            cluster: "pve-a".to_string(),
            cloud_domain: "example.com".to_string(),
        })
    }

    async fn cloud_inventory(&self, _target_pve: &str) -> pxc::Result<CloudInventory> {
        self.0.calls.lock().unwrap().push("inventory");
        Ok(CloudInventory {
            inventory: "pve: {}\n".to_string(),
            cloud_domain: "example.com".to_string(),
        })
    }
}

struct Env(Arc<Recorder>);

#[async_trait]
impl EnvResolver for Env {
    async fn cloud_env(&self, host: &PveHost) -> pxc::Result<CloudEnv> {
        self.0.calls.lock().unwrap().push("env");
        Ok(CloudEnv {
            host: host.clone(),
            cluster_vars: ClusterVars::parse("pve_cloud_domain: example.com\n")?,
            patroni_pass: String::new(),
            bind_internal_key: String::new(),
        })
    }
}

struct Source(Arc<Recorder>);

#[async_trait]
impl KubeconfigSource for Source {
    async fn master_kubeconfig(&self, _env: &CloudEnv, _stack_name: &str) -> pxc::Result<String> {
        self.0.calls.lock().unwrap().push("kubeconfig");
        Ok(KUBECONFIG.to_string())
    }
}

#[tokio::test]
async fn test_kubeconfig_over_grpc() {
    let recorder = Arc::new(Recorder::default());
    let resolver = CloudResolver::new(
        Arc::new(Discovery(recorder.clone())),
        Arc::new(Env(recorder.clone())),
        Arc::new(Source(recorder.clone())),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve_tcp(resolver, listener, async {
        rx.await.ok();
    }));

    let endpoint = format!("http://{}", addr);
    let mut client = CloudServiceClient::connect(endpoint.clone())
        .await
        .expect("connect to server");

    let resp = client
        .get_master_kubeconfig(GetKubeconfigRequest {
            target_pve: "pve-a.example.com".to_string(),
            stack_name: "k8s".to_string(),
        })
        .await
        .expect("kubeconfig rpc")
        .into_inner();

    assert_eq!(resp.config, KUBECONFIG);
    assert_eq!(
        *recorder.calls.lock().unwrap(),
        vec!["discovery", "env", "kubeconfig"]
    );

    let status = client
        .get_master_kubeconfig(GetKubeconfigRequest {
            target_pve: "pve-z.example.com".to_string(),
            stack_name: "k8s".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::NotFound);

    let inventory = client
        .get_pve_inventory(GetPveInventoryRequest {
            target_pve: "pve-a.example.com".to_string(),
        })
        .await
        .expect("inventory rpc")
        .into_inner();
    assert_eq!(inventory.cloud_domain, "example.com");
    assert_eq!(recorder.calls.lock().unwrap().last(), Some(&"inventory"));

    let mut health = HealthClient::connect(endpoint).await.unwrap();
    let resp = health
        .check(HealthCheckRequest {
            target_pve: String::new(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.status(), ServingStatus::Serving);

    drop(client);
    drop(health);
    tx.send(()).unwrap();
    server.await.unwrap().expect("server shuts down cleanly");
}
