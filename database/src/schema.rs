diesel::table! {
    snapshots (id) {
        id -> Text,
        block_height -> BigInt,
        timestamp -> Timestamp,
        total_supply -> Text,
        reward -> Text,
        phala_chain_bridge -> Text,
        khala_chain_bridge -> Text,
        sygma_bridge -> Text,
        portal_bridge -> Text,
        circulation -> Text,
    }
}

diesel::table! {
    circulation (id) {
        id -> Text,
        block_height -> BigInt,
        timestamp -> Timestamp,
        total_supply -> Text,
        reward -> Text,
        phala_chain_bridge -> Text,
        khala_chain_bridge -> Text,
        sygma_bridge -> Text,
        portal_bridge -> Text,
        #[sql_name = "circulation"]
        circulation_value -> Text,
    }
}
