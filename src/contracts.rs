#![allow(missing_docs)]

use ethers::prelude::abigen;

// The two bridge surfaces this relayer touches. The source side is only ever
// read (log queries); the destination side is only ever written.

abigen!(
    SourceBridge,
    r#"[
        event TokensLocked(uint256 indexed sequence, address indexed recipient, uint256 indexed amount)
    ]"#
);

abigen!(
    DestinationBridge,
    r#"[
        function releaseTokens(address recipient, uint256 amount, uint256 sequence, bytes signature)
    ]"#
);
