use alloy::sol;

sol! {
    /// Event and call surface of the bridge contract deployed on every chain.
    ///
    /// Deposit/Redeem variants fire on the source chain, Mint/Withdraw
    /// variants on the destination chain. The `mintAndSwap` and
    /// `withdrawAndRemove` call signatures are needed to recover the pool
    /// address from the originating transaction input.
    interface SynapseBridge {
        event TokenDeposit(address indexed to, uint256 chainId, address token, uint256 amount);

        event TokenDepositAndSwap(
            address indexed to,
            uint256 chainId,
            address token,
            uint256 amount,
            uint8 tokenIndexFrom,
            uint8 tokenIndexTo,
            uint256 minDy,
            uint256 deadline
        );

        event TokenRedeem(address indexed to, uint256 chainId, address token, uint256 amount);

        event TokenRedeemAndSwap(
            address indexed to,
            uint256 chainId,
            address token,
            uint256 amount,
            uint8 tokenIndexFrom,
            uint8 tokenIndexTo,
            uint256 minDy,
            uint256 deadline
        );

        event TokenRedeemAndRemove(
            address indexed to,
            uint256 chainId,
            address token,
            uint256 amount,
            uint8 swapTokenIndex,
            uint256 swapMinAmount,
            uint256 swapDeadline
        );

        event TokenMint(
            address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa
        );

        event TokenMintAndSwap(
            address indexed to,
            address token,
            uint256 amount,
            uint256 fee,
            uint8 tokenIndexFrom,
            uint8 tokenIndexTo,
            uint256 minDy,
            uint256 deadline,
            bool swapSuccess,
            bytes32 indexed kappa
        );

        event TokenWithdraw(
            address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa
        );

        event TokenWithdrawAndRemove(
            address indexed to,
            address token,
            uint256 amount,
            uint256 fee,
            uint8 swapTokenIndex,
            uint256 swapMinAmount,
            uint256 swapDeadline,
            bool swapSuccess,
            bytes32 indexed kappa
        );

        function mint(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);

        function mintAndSwap(
            address to,
            address token,
            uint256 amount,
            uint256 fee,
            address pool,
            uint8 tokenIndexFrom,
            uint8 tokenIndexTo,
            uint256 minDy,
            uint256 deadline,
            bytes32 kappa
        );

        function withdraw(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);

        function withdrawAndRemove(
            address to,
            address token,
            uint256 amount,
            uint256 fee,
            address pool,
            uint8 swapTokenIndex,
            uint256 swapMinAmount,
            uint256 swapDeadline,
            bytes32 kappa
        );
    }

    #[sol(rpc)]
    interface ERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    /// Minimal stableswap pool surface: `getToken(i)` reverts past the last
    /// index, which terminates the enumeration.
    #[sol(rpc)]
    interface BasePool {
        function getToken(uint8 index) external view returns (address);
    }

    /// Global token directory deployed on ethereum. `getToken` answers with an
    /// all-zero record for unknown (symbol, chain) pairs.
    #[sol(rpc)]
    interface BridgeConfig {
        struct Token {
            uint256 chainId;
            address tokenAddress;
            uint8 tokenDecimals;
            uint256 maxSwap;
            uint256 minSwap;
            uint256 swapFee;
            uint256 minSwapFee;
            uint256 maxSwapFee;
            bool hasUnderlying;
            bool isUnderlying;
        }

        function getTokenID(address tokenAddress, uint256 chainID) external view returns (string);
        function getToken(string tokenID, uint256 chainID) external view returns (Token);
    }
}
