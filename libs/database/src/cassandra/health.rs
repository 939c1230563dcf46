use scylla::client::session::Session;

use super::connector::CassandraError;

const LOCAL_INFO_QUERY: &str =
    "SELECT cluster_name, data_center, rack, release_version FROM system.local";

/// Identity of the coordinator node the session answered from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: Option<String>,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
    pub release_version: Option<String>,
}

/// `true` when the session can still answer a trivial query
pub async fn check_health(session: &Session) -> bool {
    session
        .query_unpaged("SELECT release_version FROM system.local", &[])
        .await
        .is_ok()
}

/// Read cluster name, datacenter, rack and version from `system.local`
///
/// Missing or undecodable columns are left as `None`; only a failed request
/// is an error.
pub async fn get_cluster_info(session: &Session) -> Result<ClusterInfo, CassandraError> {
    let result = session.query_unpaged(LOCAL_INFO_QUERY, &[]).await?;

    let mut info = ClusterInfo::default();

    if let Ok(rows_result) = result.into_rows_result()
        && let Ok(mut rows) = rows_result.rows::<(
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )>()
        && let Some(Ok((cluster_name, datacenter, rack, release_version))) = rows.next()
    {
        info = ClusterInfo {
            cluster_name,
            datacenter,
            rack,
            release_version,
        };
    }

    Ok(info)
}
